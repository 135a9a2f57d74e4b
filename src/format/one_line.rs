//! One-line `.list` format
//!
//! ```text
//! deb http://archive.ubuntu.com/ubuntu jammy main restricted
//! # deb-src http://archive.ubuntu.com/ubuntu jammy main
//! ```
//!
//! A line is a candidate if, once trimmed, it starts with `deb` or with a
//! `#` marker followed by at most one space and then `deb`. Anything else is
//! skipped without error.

use std::path::Path;

use crate::domain::{Entry, EntryKind};

const KEYWORD: &str = "deb";

/// Prefix written in front of a line to disable it
pub const DISABLE_MARKER: &str = "# ";

/// Splits a trimmed candidate into `(enabled, body)`, where `body` is the
/// marker-stripped declaration. Returns `None` for non-candidates.
fn classify(trimmed: &str) -> Option<(bool, &str)> {
    if trimmed.starts_with(KEYWORD) {
        return Some((true, trimmed));
    }

    let rest = trimmed.strip_prefix('#')?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    rest.starts_with(KEYWORD).then_some((false, rest))
}

/// Parses a single line, returning an entry if it is a declaration
pub fn parse_line(path: &Path, line: &str) -> Option<Entry> {
    let (enabled, body) = classify(line.trim())?;
    let words: Vec<&str> = body.split_whitespace().collect();

    Some(Entry {
        source_file: path.to_path_buf(),
        raw_text: line.to_string(),
        enabled,
        kind: EntryKind::OneLine,
        types: words.first().map(|s| s.to_string()).unwrap_or_default(),
        uri: words.get(1).map(|s| s.to_string()).unwrap_or_default(),
        suite: words.get(2).map(|s| s.to_string()).unwrap_or_default(),
        components: words.get(3..).map(|c| c.join(" ")).unwrap_or_default(),
    })
}

/// Parses the contents of a `.list` file
pub fn parse(path: &Path, content: &str) -> Vec<Entry> {
    content
        .lines()
        .filter_map(|line| parse_line(path, line))
        .collect()
}

/// Returns the line with its disable marker removed
///
/// Leading indentation is kept; exactly one `"# "` or `"#"` is stripped.
pub fn enable_line(line: &str) -> String {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let stripped = body
        .strip_prefix(DISABLE_MARKER)
        .or_else(|| body.strip_prefix('#'))
        .unwrap_or(body);

    format!("{}{}", indent, stripped)
}

/// Returns the line with a disable marker prepended
pub fn disable_line(line: &str) -> String {
    format!("{}{}", DISABLE_MARKER, line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path() -> &'static Path {
        Path::new("/etc/apt/sources.list")
    }

    #[test]
    fn parses_enabled_line() {
        let entry = parse_line(path(), "deb http://example.test/repo focal main universe").unwrap();
        assert!(entry.enabled);
        assert_eq!(entry.kind, EntryKind::OneLine);
        assert_eq!(entry.types, "deb");
        assert_eq!(entry.uri, "http://example.test/repo");
        assert_eq!(entry.suite, "focal");
        assert_eq!(entry.components, "main universe");
    }

    #[test]
    fn parses_disabled_variants() {
        for line in ["# deb http://x focal main", "#deb http://x focal main", "  # deb http://x focal"] {
            let entry = parse_line(path(), line).unwrap();
            assert!(!entry.enabled, "{line}");
            assert_eq!(entry.uri, "http://x");
            assert_eq!(entry.raw_text, line);
        }
    }

    #[test]
    fn keeps_raw_text_verbatim() {
        let line = "deb  http://x   focal main  ";
        let entry = parse_line(path(), line).unwrap();
        assert_eq!(entry.raw_text, line);
        assert_eq!(entry.suite, "focal");
    }

    #[test]
    fn skips_non_candidates() {
        let content = "\n# Ubuntu sources\n#  deb http://two-spaces focal\n\
                       deb-src http://x focal main\nrandom text\n## deb http://x\n";
        let entries = parse(path(), content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].types, "deb-src");
    }

    #[test]
    fn missing_fields_are_empty() {
        let entry = parse_line(path(), "deb").unwrap();
        assert!(entry.uri.is_empty());
        assert!(entry.suite.is_empty());
        assert!(entry.components.is_empty());
    }

    #[test]
    fn enable_strips_one_marker() {
        assert_eq!(enable_line("# deb http://x focal"), "deb http://x focal");
        assert_eq!(enable_line("#deb http://x focal"), "deb http://x focal");
        assert_eq!(enable_line("  # deb http://x"), "  deb http://x");
    }

    #[test]
    fn disable_prepends_marker() {
        assert_eq!(disable_line("deb http://x focal main"), "# deb http://x focal main");
    }

    proptest! {
        #[test]
        fn marker_state_round_trips(
            uri in "https?://[a-z]{1,12}\\.test/[a-z]{0,8}",
            suite in "[a-z]{3,10}(-updates)?",
            components in proptest::collection::vec("[a-z]{3,10}", 0..4),
            disabled in any::<bool>(),
        ) {
            let mut line = format!("deb {} {}", uri, suite);
            for c in &components {
                line.push(' ');
                line.push_str(c);
            }
            if disabled {
                line = disable_line(&line);
            }

            let entry = parse_line(path(), &line).unwrap();
            prop_assert_eq!(entry.enabled, !disabled);

            let mut rebuilt = format!("{} {} {}", entry.types, entry.uri, entry.suite);
            if !entry.components.is_empty() {
                rebuilt.push(' ');
                rebuilt.push_str(&entry.components);
            }
            if !entry.enabled {
                rebuilt = disable_line(&rebuilt);
            }
            prop_assert_eq!(&rebuilt, &line);
            prop_assert_eq!(&entry.raw_text, &line);

            let flipped = if entry.enabled { disable_line(&line) } else { enable_line(&line) };
            let back = if entry.enabled { enable_line(&flipped) } else { disable_line(&flipped) };
            prop_assert_eq!(back, line);
        }
    }
}
