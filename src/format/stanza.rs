//! deb822 `.sources` format
//!
//! ```text
//! Types: deb
//! URIs: http://deb.debian.org/debian
//! Suites: bookworm bookworm-updates
//! Components: main contrib
//! Enabled: no
//! ```
//!
//! Stanzas are separated by blank lines. A stanza with several URIs and
//! suites expands to one [`Entry`] per (URI, suite) pair; all of them share
//! the stanza's index and are edited as a unit.

use std::path::Path;

use crate::domain::{Entry, EntryKind};

pub const TYPES_FIELD: &str = "Types:";
pub const URIS_FIELD: &str = "URIs:";
pub const SUITES_FIELD: &str = "Suites:";
pub const COMPONENTS_FIELD: &str = "Components:";
pub const ENABLED_FIELD: &str = "Enabled:";

/// Line range of one stanza, recomputed for every edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StanzaRange {
    /// First line of the stanza (inclusive)
    pub start: usize,
    /// Last line of the stanza (inclusive)
    pub end: usize,
    /// Line holding the `Enabled:` field, if present
    pub enabled_line: Option<usize>,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Returns true for the values APT treats as enabled
pub fn is_yes(value: &str) -> bool {
    matches!(value, "yes" | "Yes" | "YES")
}

/// Computes the range of every stanza in `lines`
pub fn stanza_ranges<S: AsRef<str>>(lines: &[S]) -> Vec<StanzaRange> {
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        match (is_blank(line.as_ref()), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                ranges.push(StanzaRange { start: s, end: i - 1, enabled_line: None });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(StanzaRange { start: s, end: lines.len() - 1, enabled_line: None });
    }

    for range in &mut ranges {
        range.enabled_line = (range.start..=range.end)
            .find(|&i| lines[i].as_ref().trim().starts_with(ENABLED_FIELD));
    }

    ranges
}

#[derive(Default)]
struct Fields<'a> {
    types: &'a str,
    uris: Vec<&'a str>,
    suites: Vec<&'a str>,
    components: &'a str,
    enabled: bool,
}

impl<'a> Fields<'a> {
    fn scan(block: &[&'a str]) -> Self {
        let mut fields = Fields {
            enabled: true,
            ..Default::default()
        };

        for line in block {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }

            if let Some(v) = line.strip_prefix(TYPES_FIELD) {
                fields.types = v.trim();
            } else if let Some(v) = line.strip_prefix(URIS_FIELD) {
                fields.uris = v.split_whitespace().collect();
            } else if let Some(v) = line.strip_prefix(SUITES_FIELD) {
                fields.suites = v.split_whitespace().collect();
            } else if let Some(v) = line.strip_prefix(COMPONENTS_FIELD) {
                fields.components = v.trim();
            } else if let Some(v) = line.strip_prefix(ENABLED_FIELD) {
                fields.enabled = is_yes(v.trim());
            }
        }

        fields
    }
}

fn expand(path: &Path, index: usize, fields: &Fields<'_>, out: &mut Vec<Entry>) {
    if !fields.types.contains("deb") || fields.uris.is_empty() || fields.suites.is_empty() {
        tracing::debug!(file = %path.display(), index, "stanza yields no entries");
        return;
    }

    let components = fields.components.split_whitespace().collect::<Vec<_>>().join(" ");

    for uri in &fields.uris {
        for suite in &fields.suites {
            let mut display = format!("{} {} {}", fields.types, uri, suite);
            if !components.is_empty() {
                display.push(' ');
                display.push_str(&components);
            }

            out.push(Entry {
                source_file: path.to_path_buf(),
                raw_text: display,
                enabled: fields.enabled,
                kind: EntryKind::Stanza { index },
                uri: uri.to_string(),
                suite: suite.to_string(),
                components: fields.components.to_string(),
                types: fields.types.to_string(),
            });
        }
    }
}

/// Parses the contents of a `.sources` file
pub fn parse(path: &Path, content: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut index = 0;

    for line in content.lines() {
        if is_blank(line) {
            if !block.is_empty() {
                expand(path, index, &Fields::scan(&block), &mut entries);
                index += 1;
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        expand(path, index, &Fields::scan(&block), &mut entries);
    }

    entries
}
