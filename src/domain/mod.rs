//! Domain models for repoman
//!
//! Pure data: repository entries and host OS identification. Parsing lives
//! in [`crate::format`], file mutation in [`crate::storage`].

mod entry;
mod os;

pub use entry::{Entry, EntryKind};
pub use os::{OsInfo, OsInfoError};
