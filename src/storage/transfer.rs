//! Export and import of repository lists
//!
//! Exports flatten every entry, whatever its source format, to one-line
//! syntax with a trailing `# from:` comment naming the source file.
//! Imports read such a file back and keep only declarations that are not
//! already present.

use std::path::Path;

use chrono::Local;

use crate::domain::Entry;

use super::pipeline::{write_lines_atomic, MutationError};

/// Renders one entry as an export line
pub fn export_line(entry: &Entry) -> String {
    let mut line = String::new();
    if !entry.enabled {
        line.push_str("# ");
    }
    line.push_str(&format!("{} {} {}", entry.type_token(), entry.uri, entry.suite));
    if !entry.components.is_empty() {
        line.push(' ');
        line.push_str(&entry.components);
    }
    line.push_str(&format!("  # from: {}", entry.source_file.display()));
    line
}

/// Writes `entries` to `path` (atomically, via a staged temp file)
pub fn export(entries: &[Entry], path: &Path) -> Result<(), MutationError> {
    let mut lines = vec![
        "# APT Repository Export - repoman".to_string(),
        format!("# Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];
    lines.extend(entries.iter().map(export_line));

    write_lines_atomic(path, &lines)
}

/// Drops a trailing `# ...` comment (a `#` preceded by whitespace)
fn strip_trailing_comment(line: &str) -> &str {
    let mut prev_ws = false;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_ws {
            return line[..i].trim_end();
        }
        prev_ws = c.is_whitespace();
    }
    line
}

/// Everything after the type token, used to detect duplicates
fn declaration_body(line: &str) -> &str {
    line.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Returns the enabled declarations in `content` not already covered by
/// `existing`, in file order and without repeats
///
/// A line counts as known when its text after the type token occurs,
/// case-insensitively, in an existing entry's display text.
pub fn new_declarations(content: &str, existing: &[Entry]) -> Vec<String> {
    let known: Vec<String> = existing
        .iter()
        .map(|e| e.display_text().trim().to_lowercase())
        .collect();
    let mut fresh: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || !line.starts_with("deb") {
            continue;
        }

        let line = strip_trailing_comment(line);
        let body = declaration_body(line).to_lowercase();
        if body.is_empty() {
            continue;
        }

        let duplicate = known.iter().any(|k| k.contains(&body))
            || fresh.iter().any(|f| declaration_body(f).to_lowercase() == body);
        if !duplicate {
            fresh.push(line.to_string());
        }
    }

    fresh
}
