//! Editing session
//!
//! A [`Session`] is the object a front end owns for its whole lifetime. It
//! bundles the [`RepoStore`], the mutation [`Pipeline`] (and with it the
//! undo stack) and the read-only flag. Every write operation ends with a
//! full reload, whether it succeeded or not, so the store always reflects
//! what is on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::{Entry, OsInfo};

use super::config::Config;
use super::edit;
use super::pipeline::{backup_file, Applied, BackupError, MutationError, Pipeline};
use super::store::{RepoStore, SourcesLayout};
use super::transfer;

/// Status reported by a successful write operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,

    /// Non-fatal problem, e.g. a skipped backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Outcome {
    fn new(message: impl Into<String>, applied: Applied) -> Self {
        Self {
            message: message.into(),
            warning: applied.warning,
        }
    }

    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: None,
        }
    }

    /// One-line status including any warning
    pub fn status_line(&self) -> String {
        match &self.warning {
            Some(w) => format!("{} [warn] {}", self.message, w),
            None => self.message.clone(),
        }
    }
}

/// Settings a session is opened with
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub layout: SourcesLayout,
    pub os: OsInfo,
    pub backup_dir: Option<PathBuf>,
    pub undo_depth: usize,
    pub read_only: bool,
}

impl SessionOptions {
    /// Options derived from configuration for the given host
    pub fn from_config(config: &Config, os: OsInfo) -> Self {
        Self {
            layout: config.layout(),
            os,
            backup_dir: Some(config.backup_dir.clone()),
            undo_depth: config.undo_depth,
            read_only: false,
        }
    }
}

/// Caller-owned store plus mutation state
#[derive(Debug)]
pub struct Session {
    store: RepoStore,
    pipeline: Pipeline,
    read_only: bool,
}

impl Session {
    /// Opens a session and performs the initial load
    pub fn open(options: SessionOptions) -> Self {
        let mut session = Self {
            store: RepoStore::new(options.layout, options.os),
            pipeline: Pipeline::new(options.backup_dir, options.undo_depth),
            read_only: options.read_only,
        };
        session.reload();
        session
    }

    pub fn store(&self) -> &RepoStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RepoStore {
        &mut self.store
    }

    pub fn entries(&self) -> &[Entry] {
        self.store.entries()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of snapshots available to undo
    pub fn undo_depth(&self) -> usize {
        self.pipeline.undo_stack().len()
    }

    /// Re-reads every source file
    pub fn reload(&mut self) -> &[Entry] {
        self.store.load_all()
    }

    fn entry(&self, index: usize) -> Result<Entry, MutationError> {
        self.store
            .get(index)
            .cloned()
            .ok_or(MutationError::UnknownEntry(index + 1))
    }

    fn ensure_writable(&self) -> Result<(), MutationError> {
        if self.read_only {
            Err(MutationError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Flips an entry's enabled state (a whole stanza for deb822 entries)
    pub fn toggle(&mut self, entry: &Entry) -> Result<Outcome, MutationError> {
        self.ensure_writable()?;
        let result = self
            .pipeline
            .apply(&entry.source_file, false, |lines| edit::toggle(entry, lines));
        self.reload();

        let applied = result?;
        let state = if entry.enabled { "disabled" } else { "enabled" };
        info!(file = %entry.source_file.display(), entry = %entry.raw_text, state, "toggled repository");
        Ok(Outcome::new(format!("Repository {}.", state), applied))
    }

    /// Toggles the entry at `index` in the master list
    pub fn toggle_at(&mut self, index: usize) -> Result<Outcome, MutationError> {
        let entry = self.entry(index)?;
        self.toggle(&entry)
    }

    /// Removes an entry's line or stanza
    pub fn delete(&mut self, entry: &Entry) -> Result<Outcome, MutationError> {
        self.ensure_writable()?;
        let result = self
            .pipeline
            .apply(&entry.source_file, false, |lines| edit::delete(entry, lines));
        self.reload();

        let applied = result?;
        info!(file = %entry.source_file.display(), entry = %entry.raw_text, "deleted repository");
        Ok(Outcome::new("Deleted.", applied))
    }

    /// Deletes the entry at `index` in the master list
    pub fn delete_at(&mut self, index: usize) -> Result<Outcome, MutationError> {
        let entry = self.entry(index)?;
        self.delete(&entry)
    }

    /// Appends a one-line declaration to `target`, creating it if needed
    pub fn add(&mut self, target: &Path, raw_line: &str) -> Result<Outcome, MutationError> {
        self.ensure_writable()?;
        let line = raw_line.trim_end_matches(['\r', '\n']);
        if !line.trim_start().starts_with("deb") || line.contains('\n') {
            return Err(MutationError::InvalidLine(line.to_string()));
        }

        let result = self.pipeline.apply(target, true, |mut lines| {
            lines.push(line.to_string());
            Ok(lines)
        });
        self.reload();

        let applied = result?;
        info!(file = %target.display(), entry = line, "added repository");
        Ok(Outcome::new(
            format!("Repository added to {}", target.display()),
            applied,
        ))
    }

    /// Restores the file captured by the most recent mutation
    pub fn undo(&mut self) -> Result<Outcome, MutationError> {
        self.ensure_writable()?;
        let result = self.pipeline.undo();
        self.reload();

        let file = result?;
        info!(file = %file.display(), "undo applied");
        Ok(Outcome::plain("Undo applied."))
    }

    /// Copies an entry's source file into the backup directory
    pub fn backup_entry_file(&self, entry: &Entry) -> Result<PathBuf, BackupError> {
        let dir = self.pipeline.backup_dir().ok_or(BackupError::NotConfigured)?;
        backup_file(&entry.source_file, dir)
    }

    /// Writes every loaded entry to a portable one-line file
    pub fn export(&self, path: &Path) -> Result<usize, MutationError> {
        transfer::export(self.store.entries(), path)?;
        Ok(self.store.entries().len())
    }

    /// Appends the new declarations found in `source` to `target`
    pub fn import(&mut self, source: &Path, target: &Path) -> Result<Outcome, MutationError> {
        self.ensure_writable()?;
        let content = fs::read_to_string(source).map_err(|e| MutationError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let new_lines = transfer::new_declarations(&content, self.store.entries());
        if new_lines.is_empty() {
            return Ok(Outcome::plain("No new repos found to import."));
        }

        let count = new_lines.len();
        let result = self.pipeline.apply(target, true, |mut lines| {
            lines.extend(new_lines);
            Ok(lines)
        });
        self.reload();

        let applied = result?;
        info!(source = %source.display(), target = %target.display(), count, "imported repositories");
        Ok(Outcome::new(format!("{} repo(s) imported.", count), applied))
    }
}
