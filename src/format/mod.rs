//! # Source File Formats
//!
//! Parsers for the two APT repository declaration formats.
//!
//! | Format | Extension | Unit | Module |
//! |--------|-----------|------|--------|
//! | One-line | `.list` | one line | [`one_line`] |
//! | deb822 | `.sources` | blank-line separated stanza | [`stanza`] |
//!
//! Both parsers are pure: they take file text and return entries, silently
//! skipping anything that is not a declaration.

pub mod one_line;
pub mod stanza;

use std::path::Path;

use crate::domain::Entry;

pub use stanza::StanzaRange;

/// Format of a source file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    OneLine,
    Stanza,
}

impl SourceFormat {
    /// Detects the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "list" => Some(SourceFormat::OneLine),
            "sources" => Some(SourceFormat::Stanza),
            _ => None,
        }
    }

    /// Parses file content in this format
    pub fn parse(self, path: &Path, content: &str) -> Vec<Entry> {
        match self {
            SourceFormat::OneLine => one_line::parse(path, content),
            SourceFormat::Stanza => stanza::parse(path, content),
        }
    }
}
