//! Repository entry model
//!
//! An [`Entry`] is one repository declaration, parsed either from a one-line
//! `.list` file or from a deb822 `.sources` stanza. Entries are produced by
//! the parsers in [`crate::format`] and are never edited in place; every
//! mutation re-reads the source file and rebuilds the list.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Which on-disk format an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum EntryKind {
    /// One physical line fully describes the entry
    OneLine,
    /// Entry expanded from the stanza at `index` (0-based, counted per file)
    Stanza { index: usize },
}

/// A single repository declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// File the entry was parsed from
    pub source_file: PathBuf,

    /// For one-line entries, the exact original line including any disable
    /// marker. This is the lookup key for later mutation and must never be
    /// normalized. For stanza entries, a synthesized display string.
    pub raw_text: String,

    /// Whether the declaration is active
    pub enabled: bool,

    /// Source format and position
    #[serde(flatten)]
    pub kind: EntryKind,

    pub uri: String,
    pub suite: String,
    pub components: String,
    pub types: String,
}

impl Entry {
    /// Returns true if the entry came from a deb822 stanza
    pub fn is_stanza(&self) -> bool {
        matches!(self.kind, EntryKind::Stanza { .. })
    }

    /// Returns the stanza index, or `None` for one-line entries
    pub fn stanza_index(&self) -> Option<usize> {
        match self.kind {
            EntryKind::Stanza { index } => Some(index),
            EntryKind::OneLine => None,
        }
    }

    /// Returns the source file path
    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    /// Text used for filtering and display
    pub fn display_text(&self) -> &str {
        &self.raw_text
    }

    /// First type token (`deb`, `deb-src`, ...), defaulting to `deb`
    pub fn type_token(&self) -> &str {
        self.types.split_whitespace().next().unwrap_or("deb")
    }

    /// Key identifying the repository a probe targets
    pub fn probe_key(&self) -> String {
        format!("{} {}", self.uri, self.suite)
    }

    /// Human-readable name of the source format
    pub fn format_label(&self) -> &'static str {
        match self.kind {
            EntryKind::OneLine => "one-line (.list)",
            EntryKind::Stanza { .. } => "deb822 (.sources)",
        }
    }
}
