//! Reads repository metadata from apt's downloaded `Release` files

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use super::{CacheState, Metadata};

/// Location of the cached `Release` file for `uri` + `suite`
///
/// apt names list files after the URI without its scheme, with `/` turned
/// into `_`: `http://archive.test/ubuntu/` + `jammy` becomes
/// `archive.test_ubuntu_dists_jammy_Release`.
pub fn release_path(lists_dir: &Path, uri: &str, suite: &str) -> Option<PathBuf> {
    if uri.is_empty() || suite.is_empty() {
        return None;
    }

    let rest = uri.split_once("://").map(|(_, r)| r).unwrap_or(uri);
    let mangled = rest.replace('/', "_");
    let host_part = mangled.trim_end_matches('_');
    if host_part.is_empty() {
        return None;
    }

    let name = format!("{}_dists_{}_Release", host_part, suite.replace('/', "_"));
    Some(lists_dir.join(name))
}

/// Fills the descriptive fields of `meta` from a `Release` file body
fn apply_fields(meta: &mut Metadata, content: &str) {
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        // Continuation lines (checksums) start with a space
        if key.starts_with(char::is_whitespace) {
            continue;
        }
        let value = value.trim().to_string();
        match key {
            "Origin" => meta.origin = value,
            "Codename" => meta.codename = value,
            "Suite" => meta.suite = value,
            "Version" => meta.version = value,
            "Date" => meta.date = value,
            "Description" => meta.description = value,
            _ => {}
        }
    }
}

/// Loads cached metadata for `uri` + `suite`
///
/// A missing or unreadable file leaves the descriptive fields empty and
/// marks the cache [`CacheState::Unavailable`].
pub fn load(lists_dir: &Path, uri: &str, suite: &str) -> Metadata {
    let mut meta = Metadata::default();

    let Some(path) = release_path(lists_dir, uri, suite) else {
        return meta;
    };

    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no cached release file");
            return meta;
        }
    };

    apply_fields(&mut meta, &content);
    meta.last_updated = fs::metadata(&path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from);
    meta.cache = CacheState::Loaded;
    meta
}
