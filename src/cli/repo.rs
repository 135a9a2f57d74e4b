//! Repository CLI commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::app::Runtime;
use super::output::Output;
use crate::domain::Entry;
use crate::storage::{RepoStore, Session, SortMode};

/// An entry together with the id the user refers to it by
#[derive(Serialize)]
pub(super) struct Listed<'a> {
    pub id: usize,
    #[serde(flatten)]
    pub entry: &'a Entry,
}

/// Converts a 1-based id into a master-list index
pub(super) fn entry_index(id: usize) -> Result<usize> {
    id.checked_sub(1).context("Repository ids start at 1")
}

pub(super) fn lookup(session: &Session, id: usize) -> Result<&Entry> {
    let index = entry_index(id)?;
    session
        .entries()
        .get(index)
        .with_context(|| format!("No repository #{}", id))
}

/// Prints the store's current view
pub(super) fn print_entries(output: &Output, store: &RepoStore) {
    if output.is_json() {
        let items: Vec<_> = store
            .view_entries()
            .map(|(index, entry)| Listed { id: index + 1, entry })
            .collect();
        output.data(&items);
        return;
    }

    if store.view().is_empty() {
        println!("No repositories found.");
        return;
    }

    println!("{:<4} {:<8} {:<6} ENTRY", "ID", "STATUS", "FORMAT");
    println!("{}", "-".repeat(72));
    for (index, entry) in store.view_entries() {
        let status = if entry.enabled { "enabled" } else { "disabled" };
        let format = if entry.is_stanza() { "deb822" } else { "list" };
        println!("{:<4} {:<8} {:<6} {}", index + 1, status, format, entry.display_text());
    }

    println!();
    println!(
        "{} of {} entries (sort: {})",
        store.view().len(),
        store.entries().len(),
        store.sort_mode().as_str()
    );
}

pub fn list(output: &Output, runtime: &Runtime, filter: Option<&str>, sort: Option<SortMode>) -> Result<()> {
    let mut session = runtime.open_session();
    session
        .store_mut()
        .rebuild_view(filter.unwrap_or(""), sort.unwrap_or(runtime.config.sort));

    print_entries(output, session.store());
    Ok(())
}

pub fn show(output: &Output, runtime: &Runtime, id: usize) -> Result<()> {
    let session = runtime.open_session();
    let entry = lookup(&session, id)?;

    if output.is_json() {
        output.data(&Listed { id, entry });
        return Ok(());
    }

    output.field("Id", &id.to_string());
    output.field("Status", if entry.enabled { "enabled" } else { "disabled" });
    output.field("Format", entry.format_label());
    output.field("File", &entry.source_file.display().to_string());
    if let Some(index) = entry.stanza_index() {
        output.field("Stanza", &index.to_string());
    }
    output.field("Types", &entry.types);
    output.field("URI", &entry.uri);
    output.field("Suite", &entry.suite);
    output.field("Components", &entry.components);
    output.blank();
    println!("{}", entry.display_text());

    Ok(())
}

pub fn toggle(output: &Output, runtime: &Runtime, id: usize) -> Result<()> {
    let mut session = runtime.open_session();
    let index = entry_index(id)?;

    let outcome = session
        .toggle_at(index)
        .with_context(|| format!("Failed to toggle repository #{}", id))?;
    output.outcome(&outcome);
    Ok(())
}

pub fn delete(output: &Output, runtime: &Runtime, id: usize) -> Result<()> {
    let mut session = runtime.open_session();
    let index = entry_index(id)?;

    let outcome = session
        .delete_at(index)
        .with_context(|| format!("Failed to delete repository #{}", id))?;
    output.outcome(&outcome);
    Ok(())
}

pub fn add(output: &Output, runtime: &Runtime, line: &str, file: Option<PathBuf>) -> Result<()> {
    let mut session = runtime.open_session();
    let target = file.unwrap_or_else(|| runtime.config.layout().main_list);

    let outcome = session.add(&target, line).context("Failed to add repository")?;
    output.outcome(&outcome);
    Ok(())
}

pub fn backup(output: &Output, runtime: &Runtime, id: usize) -> Result<()> {
    let session = runtime.open_session();
    let entry = lookup(&session, id)?;

    let path = session
        .backup_entry_file(entry)
        .with_context(|| format!("Failed to back up {}", entry.source_file.display()))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "backup": path,
        }));
    } else {
        output.success(&format!("Backup created: {}", path.display()));
    }
    Ok(())
}

pub fn export(output: &Output, runtime: &Runtime, path: &Path) -> Result<()> {
    let session = runtime.open_session();

    let count = session
        .export(path)
        .with_context(|| format!("Failed to export to {}", path.display()))?;
    output.success(&format!("Exported {} repo(s) to {}", count, path.display()));
    Ok(())
}

pub fn import(output: &Output, runtime: &Runtime, path: &Path, file: Option<PathBuf>) -> Result<()> {
    let mut session = runtime.open_session();
    let target = file.unwrap_or_else(|| runtime.config.layout().main_list);

    let outcome = session
        .import(path, &target)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    output.outcome(&outcome);
    Ok(())
}

pub fn os(output: &Output, runtime: &Runtime) -> Result<()> {
    let layout = runtime.config.layout();
    let deb822 = runtime.os.supports_deb822();

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": runtime.os.id,
            "version": runtime.os.version,
            "deb822": deb822,
            "main_list": layout.main_list,
            "parts_dir": layout.parts_dir,
        }));
        return Ok(());
    }

    output.field("OS", &runtime.os.to_string());
    output.field("Main list", &layout.main_list.display().to_string());
    output.field("Parts dir", &layout.parts_dir.display().to_string());
    output.field("Formats", if deb822 { ".list, .sources" } else { ".list" });
    Ok(())
}
