//! Toggle and delete edits
//!
//! Each function takes the freshly read lines of an entry's file and returns
//! the replacement lines. Positions are never cached between edits: a
//! one-line entry is found again by its exact raw text, a stanza by
//! recomputing block ranges and indexing them.

use crate::domain::{Entry, EntryKind};
use crate::format::one_line;
use crate::format::stanza::{self, ENABLED_FIELD};

use super::pipeline::MutationError;

/// Flips the enabled state of `entry`
pub fn toggle(entry: &Entry, lines: Vec<String>) -> Result<Vec<String>, MutationError> {
    match entry.kind {
        EntryKind::OneLine => toggle_line(entry, lines),
        EntryKind::Stanza { index } => toggle_stanza(entry, index, lines),
    }
}

/// Removes `entry` (its line, or its whole stanza)
pub fn delete(entry: &Entry, lines: Vec<String>) -> Result<Vec<String>, MutationError> {
    match entry.kind {
        EntryKind::OneLine => delete_line(entry, lines),
        EntryKind::Stanza { index } => delete_stanza(entry, index, lines),
    }
}

fn find_line(entry: &Entry, lines: &[String]) -> Result<usize, MutationError> {
    lines
        .iter()
        .position(|l| *l == entry.raw_text)
        .ok_or_else(|| MutationError::LineNotFound {
            path: entry.source_file.clone(),
        })
}

fn toggle_line(entry: &Entry, mut lines: Vec<String>) -> Result<Vec<String>, MutationError> {
    let at = find_line(entry, &lines)?;
    lines[at] = if entry.enabled {
        one_line::disable_line(&lines[at])
    } else {
        one_line::enable_line(&lines[at])
    };
    Ok(lines)
}

fn delete_line(entry: &Entry, mut lines: Vec<String>) -> Result<Vec<String>, MutationError> {
    let at = find_line(entry, &lines)?;
    lines.remove(at);
    Ok(lines)
}

fn locate_stanza(
    entry: &Entry,
    index: usize,
    lines: &[String],
) -> Result<stanza::StanzaRange, MutationError> {
    let ranges = stanza::stanza_ranges(lines);
    ranges
        .get(index)
        .copied()
        .ok_or_else(|| MutationError::StanzaOutOfRange {
            path: entry.source_file.clone(),
            index,
            count: ranges.len(),
        })
}

fn toggle_stanza(
    entry: &Entry,
    index: usize,
    mut lines: Vec<String>,
) -> Result<Vec<String>, MutationError> {
    let range = locate_stanza(entry, index, &lines)?;
    let value = if entry.enabled { "no" } else { "yes" };
    let field = format!("{} {}", ENABLED_FIELD, value);

    match range.enabled_line {
        Some(at) => lines[at] = field,
        // Right after the first line (normally `Types:`), never creating a
        // blank line inside the stanza
        None => lines.insert(range.start + 1, field),
    }
    Ok(lines)
}

fn delete_stanza(
    entry: &Entry,
    index: usize,
    mut lines: Vec<String>,
) -> Result<Vec<String>, MutationError> {
    let range = locate_stanza(entry, index, &lines)?;

    let mut end = range.end;
    if lines.get(end + 1).is_some_and(|l| l.trim().is_empty()) {
        end += 1;
    }
    lines.drain(range.start..=end);
    Ok(lines)
}
