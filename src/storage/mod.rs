//! # Storage Layer
//!
//! Loading and safe mutation of APT source files.
//!
//! ## Source Locations
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Main list | one-line | `/etc/apt/sources.list` |
//! | Parts | one-line | `/etc/apt/sources.list.d/*.list` |
//! | Parts | deb822 (Ubuntu 22.04+, Debian 12+) | `/etc/apt/sources.list.d/*.sources` |
//! | Backups | verbatim copy | `<backup_dir>/<path>.<YYYYMMDD_HHMMSS>.bak` |
//! | Config | TOML | `~/.config/repoman/config.toml` |
//!
//! ## Write Safety
//!
//! - Every write goes through [`Pipeline::apply`]: snapshot, backup, edit,
//!   then temp file + rename
//! - Edits locate their target again in freshly read content; a missing
//!   line or stanza aborts before anything is written
//! - [`Session`] reloads the [`RepoStore`] after every write attempt
//!
//! ## Key Types
//!
//! - [`Session`] - Entry point owning the store, undo stack and policy
//! - [`RepoStore`] - Master entry list and filtered/sorted view
//! - [`Pipeline`] - Snapshot/backup/atomic-replace sequence
//! - [`Config`] - User configuration

pub mod edit;
mod config;
mod pipeline;
mod session;
mod store;
pub mod transfer;

pub use config::{Config, ConfigError, DEFAULT_PROBE_TIMEOUT_MS};
pub use pipeline::{
    backup_file, backup_name, read_lines, temp_path_for, write_lines_atomic, Applied, BackupError,
    MutationError, Pipeline, Snapshot, StagedWrite, UndoStack, TEMP_SUFFIX, UNDO_DEPTH,
};
pub use session::{Outcome, Session, SessionOptions};
pub use store::{RepoStore, SortMode, SourcesLayout};
