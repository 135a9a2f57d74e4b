//! repoman - APT repository source manager
//!
//! Reads repository declarations from `sources.list`, `*.list` and deb822
//! `*.sources` files into one entry list, and changes those files only
//! through a snapshot/backup/atomic-replace pipeline with undo. A background
//! prober reports reachability and cached `Release` metadata under a fixed
//! deadline.

pub mod domain;
pub mod format;
pub mod storage;
pub mod probe;
pub mod cli;

pub use domain::{Entry, EntryKind, OsInfo};
pub use probe::{Metadata, ProbeReport, Prober};
pub use storage::{Config, MutationError, Outcome, RepoStore, Session, SortMode};
