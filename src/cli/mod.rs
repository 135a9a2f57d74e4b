//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Inspect | Read source files | `list`, `show`, `os` |
//! | Change | Write through the mutation pipeline | `toggle`, `delete`, `add` |
//! | Transfer | Portable one-line files | `export`, `import`, `backup` |
//! | Network | Reachability and cached metadata | `probe` |
//! | Session | Several commands sharing undo history | `exec` |
//!
//! Ids are the 1-based numbers printed by `list`. They refer to the load
//! order, so they stay stable across filters and sort modes.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Testing Against a Fake Root
//!
//! `--root` resolves every APT path (sources, `os-release`, list cache)
//! under another directory:
//! ```bash
//! repoman --root /tmp/fakeroot --os-id ubuntu --os-version 22.04 list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod exec;
mod output;
mod probe_cmd;
mod repo;

pub use app::{run, Cli, Commands, Runtime};
pub use output::{Output, OutputFormat};
