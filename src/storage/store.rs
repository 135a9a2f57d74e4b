//! Repository store
//!
//! Holds the master list of entries in load order and a derived view (a
//! filtered, sorted list of indices into it). Loading always rebuilds from
//! disk; nothing patches the list incrementally.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Entry, OsInfo};
use crate::format::SourceFormat;

/// Ordering applied to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Source file path, then raw text
    #[default]
    File,
    /// Enabled entries first, then raw text
    Status,
    /// Case-insensitive raw text
    Alpha,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::File => "file",
            SortMode::Status => "status",
            SortMode::Alpha => "alpha",
        }
    }

    fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            SortMode::File => a
                .source_file
                .cmp(&b.source_file)
                .then_with(|| a.raw_text.cmp(&b.raw_text)),
            SortMode::Status => b
                .enabled
                .cmp(&a.enabled)
                .then_with(|| a.raw_text.cmp(&b.raw_text)),
            SortMode::Alpha => a.raw_text.to_lowercase().cmp(&b.raw_text.to_lowercase()),
        }
    }
}

/// Where APT keeps its source files, relative to a filesystem root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesLayout {
    pub main_list: PathBuf,
    pub parts_dir: PathBuf,
}

impl Default for SourcesLayout {
    fn default() -> Self {
        Self::under(Path::new("/"))
    }
}

impl SourcesLayout {
    /// Standard locations below `root`
    pub fn under(root: &Path) -> Self {
        Self {
            main_list: root.join("etc/apt/sources.list"),
            parts_dir: root.join("etc/apt/sources.list.d"),
        }
    }
}

/// Master entry list plus its filtered/sorted view
#[derive(Debug)]
pub struct RepoStore {
    layout: SourcesLayout,
    os: OsInfo,
    entries: Vec<Entry>,
    view: Vec<usize>,
    filter: String,
    sort: SortMode,
}

impl RepoStore {
    pub fn new(layout: SourcesLayout, os: OsInfo) -> Self {
        Self {
            layout,
            os,
            entries: Vec::new(),
            view: Vec::new(),
            filter: String::new(),
            sort: SortMode::default(),
        }
    }

    pub fn layout(&self) -> &SourcesLayout {
        &self.layout
    }

    pub fn os(&self) -> &OsInfo {
        &self.os
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn view(&self) -> &[usize] {
        &self.view
    }

    /// Entries in view order
    pub fn view_entries(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.view.iter().map(move |&i| (i, &self.entries[i]))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort
    }

    /// Source files to read, in load order
    ///
    /// The main list comes first, then `*.list` (and, on deb822 hosts,
    /// `*.sources`) from the parts directory in sorted path order.
    pub fn source_files(&self) -> Vec<(PathBuf, SourceFormat)> {
        let mut files = Vec::new();
        if self.layout.main_list.is_file() {
            files.push((self.layout.main_list.clone(), SourceFormat::OneLine));
        }

        let dir = match fs::read_dir(&self.layout.parts_dir) {
            Ok(dir) => dir,
            Err(_) => return files,
        };

        let mut parts: Vec<PathBuf> = dir.flatten().map(|e| e.path()).collect();
        parts.sort();

        let deb822 = self.os.supports_deb822();
        for path in parts {
            match SourceFormat::from_path(&path) {
                Some(SourceFormat::OneLine) => files.push((path, SourceFormat::OneLine)),
                Some(SourceFormat::Stanza) if deb822 => files.push((path, SourceFormat::Stanza)),
                Some(SourceFormat::Stanza) => {
                    debug!(file = %path.display(), os = %self.os, "ignoring .sources file");
                }
                None => {}
            }
        }

        files
    }

    /// Clears and re-reads every source file, then rebuilds the view
    pub fn load_all(&mut self) -> &[Entry] {
        self.entries.clear();

        for (path, format) in self.source_files() {
            // Lossy: a stray non-UTF-8 byte garbles one line, not the file
            match fs::read(&path) {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes);
                    self.entries.extend(format.parse(&path, &content));
                }
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable source file"),
            }
        }

        debug!(count = self.entries.len(), "loaded repository entries");
        self.refresh_view();
        &self.entries
    }

    /// Applies a new filter and sort mode, returning the ordered indices
    pub fn rebuild_view(&mut self, filter: &str, sort: SortMode) -> &[usize] {
        self.filter = filter.to_string();
        self.sort = sort;
        self.refresh_view();
        &self.view
    }

    fn refresh_view(&mut self) {
        let needle = self.filter.to_lowercase();
        let entries = &self.entries;

        let mut view: Vec<usize> = (0..entries.len())
            .filter(|&i| needle.is_empty() || entries[i].display_text().to_lowercase().contains(&needle))
            .collect();

        // Stable: equal entries keep load order
        let sort = self.sort;
        view.sort_by(|&a, &b| sort.compare(&entries[a], &entries[b]));
        self.view = view;
    }
}
