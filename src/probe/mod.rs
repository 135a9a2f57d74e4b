//! # Repository Prober
//!
//! Background lookup of reachability and cached metadata for one entry.
//!
//! A probe runs on a worker thread and hands its [`ProbeReport`] back
//! through a single-slot channel. The owner calls [`Prober::poll`] from its
//! own loop; nothing blocks the caller. At most one probe runs at a time:
//! [`Prober::request`] refuses new work while the worker is running, and
//! drops a finished report nobody collected.
//!
//! Reachability is a plain TCP connect to the URI's host with a deadline
//! that covers both name resolution and the connection attempt. See
//! [`reach`] for how resolution is bounded.

pub mod cache;
pub mod reach;

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Entry;

/// Why a repository host was judged unreachable
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    #[error("No host in URI: {0}")]
    InvalidUri(String),

    #[error("DNS resolution timed out")]
    ResolveTimeout,

    #[error("DNS resolution failed: {0}")]
    ResolveFailed(String),

    #[error("Host resolved to no addresses")]
    NoAddress,

    #[error("Connection timed out")]
    ConnectTimeout,

    #[error("Connection failed: {0}")]
    ConnectFailed(String),
}

/// Whether the apt list cache had a `Release` file for the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Loaded,
    #[default]
    Unavailable,
}

/// Everything known about a repository after a probe
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub origin: String,
    pub codename: String,
    pub suite: String,
    pub version: String,
    pub date: String,
    pub description: String,
    /// Modification time of the cached `Release` file
    pub last_updated: Option<DateTime<Local>>,
    pub reachable: bool,
    pub error: Option<ProbeFailure>,
    pub cache: CacheState,
}

/// What a probe looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeTarget {
    pub uri: String,
    pub suite: String,
}

impl ProbeTarget {
    pub fn of(entry: &Entry) -> Self {
        Self {
            uri: entry.uri.clone(),
            suite: entry.suite.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    pub metadata: Metadata,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Budget shared by name resolution and the connection attempt
    pub timeout: Duration,
    /// apt's list cache (`/var/lib/apt/lists`)
    pub lists_dir: PathBuf,
}

/// Probes `target` synchronously: cache lookup, then reachability
pub fn probe_target(target: &ProbeTarget, settings: &ProbeSettings) -> Metadata {
    let mut meta = cache::load(&settings.lists_dir, &target.uri, &target.suite);

    match reach::check(&target.uri, settings.timeout) {
        Ok(()) => meta.reachable = true,
        Err(failure) => {
            debug!(uri = %target.uri, %failure, "unreachable");
            meta.reachable = false;
            meta.error = Some(failure);
        }
    }

    meta
}

/// Owns the background probe and its handoff slot
pub struct Prober {
    settings: ProbeSettings,
    inflight: Option<Receiver<ProbeReport>>,
    target: Option<ProbeTarget>,
}

impl Prober {
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings,
            inflight: None,
            target: None,
        }
    }

    /// True while a report has not been collected yet
    pub fn is_busy(&self) -> bool {
        self.inflight.is_some()
    }

    /// Target of the outstanding probe, if any
    pub fn pending(&self) -> Option<&ProbeTarget> {
        self.target.as_ref()
    }

    /// Starts probing `entry` in the background
    ///
    /// Returns false, without side effects, while another probe is still
    /// running. A finished report that was never polled is replaced.
    pub fn request(&mut self, entry: &Entry) -> bool {
        if let Some(rx) = &self.inflight {
            match rx.try_recv() {
                Err(TryRecvError::Empty) => {
                    debug!(uri = %entry.uri, "probe already running, ignoring request");
                    return false;
                }
                Ok(stale) => {
                    debug!(uri = %stale.target.uri, "discarding uncollected probe report");
                }
                Err(TryRecvError::Disconnected) => {}
            }
            self.inflight = None;
            self.target = None;
        }

        let target = ProbeTarget::of(entry);
        let settings = self.settings.clone();
        let (tx, rx) = mpsc::sync_channel(1);

        let worker_target = target.clone();
        let spawned = thread::Builder::new()
            .name("probe".into())
            .spawn(move || {
                let start = Instant::now();
                let metadata = probe_target(&worker_target, &settings);
                let report = ProbeReport {
                    target: worker_target,
                    metadata,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                };
                // Owner may have been dropped in the meantime
                let _ = tx.send(report);
            });

        match spawned {
            Ok(_) => {
                debug!(uri = %target.uri, suite = %target.suite, "probe started");
                self.inflight = Some(rx);
                self.target = Some(target);
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to spawn probe thread");
                false
            }
        }
    }

    /// Collects the finished report, if there is one
    pub fn poll(&mut self) -> Option<ProbeReport> {
        let rx = self.inflight.as_ref()?;

        match rx.try_recv() {
            Ok(report) => {
                self.inflight = None;
                self.target = None;
                Some(report)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("probe thread exited without a report");
                self.inflight = None;
                self.target = None;
                None
            }
        }
    }

    /// Polls every `tick` until the outstanding report arrives
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub fn wait(&mut self, tick: Duration) -> Option<ProbeReport> {
        while self.is_busy() {
            if let Some(report) = self.poll() {
                return Some(report);
            }
            thread::sleep(tick);
        }
        None
    }
}
