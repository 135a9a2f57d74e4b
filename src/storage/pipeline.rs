//! Mutation pipeline
//!
//! Every change to a source file goes through [`Pipeline::apply`]:
//!
//! 1. read the target into lines
//! 2. push a [`Snapshot`] onto the [`UndoStack`]
//! 3. copy the file into the backup directory (failure is only a warning)
//! 4. compute the new lines
//! 5. write them to a temp file next to the target, then rename it into place
//!
//! The rename is the only step that touches the target, so readers such as
//! APT never see a half-written file.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of snapshots kept for undo
pub const UNDO_DEPTH: usize = 20;

/// Suffix appended to the target name for the staged temp file
pub const TEMP_SUFFIX: &str = ".repoman-tmp";

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Line not found in {} (file changed externally?)", path.display())]
    LineNotFound { path: PathBuf },

    #[error("Stanza {index} out of range in {} ({count} found, file changed externally?)", path.display())]
    StanzaOutOfRange {
        path: PathBuf,
        index: usize,
        count: usize,
    },

    #[error("Write to {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Nothing to undo.")]
    UndoEmpty,

    #[error("Read-only mode.")]
    ReadOnly,

    #[error("Invalid repository line: {0}")]
    InvalidLine(String),

    #[error("No repository #{0}")]
    UnknownEntry(usize),
}

impl MutationError {
    /// Returns true if the on-disk content no longer matches the entry
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            MutationError::LineNotFound { .. } | MutationError::StanzaOutOfRange { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("No backup directory configured")]
    NotConfigured,

    #[error("Cannot create backup dir {}: {source}", dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Backup copy of {} failed: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reads a file into lines, accepting `\n` and `\r\n` endings
///
/// Invalid UTF-8 is an `InvalidData` error rather than a lossy decode, so a
/// rewrite never replaces bytes it could not read.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().map(str::to_string).collect())
}

/// File content captured before a destructive write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub file: PathBuf,
    pub lines: Vec<String>,
}

/// Bounded LIFO of snapshots; the oldest is evicted when full
#[derive(Debug)]
pub struct UndoStack {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_capacity(UNDO_DEPTH)
    }
}

impl UndoStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_back()
    }

    /// Most recent snapshot, without removing it
    pub fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Backup file name for `src` taken at `at`
///
/// `/etc/apt/sources.list` at 2024-03-01 12:30:05 becomes
/// `_etc_apt_sources.list.20240301_123005.bak`.
pub fn backup_name(src: &Path, at: DateTime<Local>) -> String {
    format!(
        "{}.{}.bak",
        src.to_string_lossy().replace('/', "_"),
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Copies `src` into `backup_dir` under a timestamped name
pub fn backup_file(src: &Path, backup_dir: &Path) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(backup_dir).map_err(|source| BackupError::CreateDir {
        dir: backup_dir.to_path_buf(),
        source,
    })?;

    let dest = backup_dir.join(backup_name(src, Local::now()));
    fs::copy(src, &dest).map_err(|source| BackupError::Copy {
        path: src.to_path_buf(),
        source,
    })?;

    debug!(src = %src.display(), dest = %dest.display(), "backup written");
    Ok(dest)
}

/// Returns the temp path used when staging a write to `target`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

/// New content written next to its target, not yet renamed into place
///
/// Dropping an uncommitted `StagedWrite` removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Writes `lines` to the temp file and syncs it to disk
    pub fn stage<S: AsRef<str>>(target: &Path, lines: &[S]) -> Result<Self, MutationError> {
        let staged = Self {
            target: target.to_path_buf(),
            temp_path: temp_path_for(target),
            committed: false,
        };
        let write_err = |source| MutationError::Write {
            path: staged.temp_path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staged.temp_path)
            .map_err(write_err)?;

        let mut writer = BufWriter::new(file);
        for line in lines {
            writer
                .write_all(line.as_ref().as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(write_err)?;
        }
        let file = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
        file.sync_all().map_err(write_err)?;

        // Keep the target's mode so a rewrite does not loosen permissions
        if let Ok(meta) = fs::metadata(&staged.target) {
            fs::set_permissions(&staged.temp_path, meta.permissions()).map_err(write_err)?;
        }

        Ok(staged)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically renames the temp file onto the target
    pub fn commit(mut self) -> Result<(), MutationError> {
        fs::rename(&self.temp_path, &self.target).map_err(|source| MutationError::Write {
            path: self.target.clone(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

/// Stages and commits `lines` to `target` in one step
pub fn write_lines_atomic<S: AsRef<str>>(target: &Path, lines: &[S]) -> Result<(), MutationError> {
    StagedWrite::stage(target, lines)?.commit()
}

/// Result of a successful [`Pipeline::apply`]
#[derive(Debug, Default)]
pub struct Applied {
    /// Where the pre-mutation backup landed
    pub backup: Option<PathBuf>,
    /// Non-fatal backup failure, if any
    pub warning: Option<String>,
}

/// Owns the undo stack and backup policy for a session
#[derive(Debug)]
pub struct Pipeline {
    undo: UndoStack,
    backup_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(backup_dir: Option<PathBuf>, undo_depth: usize) -> Self {
        Self {
            undo: UndoStack::with_capacity(undo_depth),
            backup_dir,
        }
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn backup_dir(&self) -> Option<&Path> {
        self.backup_dir.as_deref()
    }

    /// Runs the full snapshot, backup and atomic-replace sequence
    ///
    /// With `missing_ok`, a target that does not exist reads as empty. If
    /// `edit` or the write fails, the snapshot pushed for this call is
    /// dropped again so undo never replays a mutation that did not happen.
    pub fn apply<F>(&mut self, target: &Path, missing_ok: bool, edit: F) -> Result<Applied, MutationError>
    where
        F: FnOnce(Vec<String>) -> Result<Vec<String>, MutationError>,
    {
        let lines = match read_lines(target) {
            Ok(lines) => lines,
            Err(e) if missing_ok && e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(MutationError::Read {
                    path: target.to_path_buf(),
                    source,
                })
            }
        };

        self.undo.push(Snapshot {
            file: target.to_path_buf(),
            lines: lines.clone(),
        });

        let mut applied = Applied::default();
        if let Some(dir) = &self.backup_dir {
            if target.exists() {
                match backup_file(target, dir) {
                    Ok(path) => applied.backup = Some(path),
                    Err(e) => {
                        warn!(target = %target.display(), error = %e, "backup skipped");
                        applied.warning = Some(format!("backup skipped: {}", e));
                    }
                }
            }
        }

        let result = edit(lines).and_then(|new_lines| write_lines_atomic(target, &new_lines));
        if let Err(e) = result {
            self.undo.pop();
            return Err(e);
        }

        Ok(applied)
    }

    /// Restores the most recent snapshot; returns the restored file
    pub fn undo(&mut self) -> Result<PathBuf, MutationError> {
        let snapshot = self.undo.peek().ok_or(MutationError::UndoEmpty)?;
        write_lines_atomic(&snapshot.file, &snapshot.lines)?;

        let file = snapshot.file.clone();
        self.undo.pop();
        Ok(file)
    }
}
