//! Probe CLI command

use std::time::Duration;

use anyhow::{Context, Result};

use super::app::Runtime;
use super::output::Output;
use super::repo::lookup;
use crate::probe::{CacheState, ProbeReport, Prober};

/// How often a waiting caller polls the prober
pub(super) const POLL_TICK: Duration = Duration::from_millis(20);

pub fn run(output: &Output, runtime: &Runtime, id: usize, timeout_ms: Option<u64>) -> Result<()> {
    let session = runtime.open_session();
    let entry = lookup(&session, id)?;

    let mut prober = Prober::new(runtime.probe_settings(timeout_ms));
    if !prober.request(entry) {
        anyhow::bail!("Could not start probe for repository #{}", id);
    }

    let report = prober
        .wait(POLL_TICK)
        .context("Probe ended without a result")?;
    print_report(output, &report);
    Ok(())
}

/// Prints a finished probe
pub(super) fn print_report(output: &Output, report: &ProbeReport) {
    if output.is_json() {
        output.data(report);
        return;
    }

    let meta = &report.metadata;
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    output.field("URI", &report.target.uri);
    output.field("Suite", &or_dash(&report.target.suite));
    match &meta.error {
        None if meta.reachable => output.field("Reachable", "yes"),
        Some(failure) => output.field("Reachable", &format!("no ({})", failure)),
        None => output.field("Reachable", "no"),
    }

    match meta.cache {
        CacheState::Loaded => {
            output.field("Origin", &or_dash(&meta.origin));
            output.field("Codename", &or_dash(&meta.codename));
            output.field("Version", &or_dash(&meta.version));
            output.field("Date", &or_dash(&meta.date));
            output.field("Description", &or_dash(&meta.description));
            if let Some(updated) = meta.last_updated {
                output.field("Updated", &updated.format("%Y-%m-%d %H:%M").to_string());
            }
        }
        CacheState::Unavailable => output.field("Metadata", "not cached (run apt update)"),
    }
    output.field("Elapsed", &format!("{} ms", report.elapsed_ms));
}
