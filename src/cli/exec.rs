//! Line-oriented session mode
//!
//! `repoman exec` keeps one [`Session`] and one [`Prober`] alive for a whole
//! script, so `undo` can reach back across earlier commands and a probe can
//! run while other commands execute.
//!
//! ```text
//! list
//! toggle 3
//! probe 1
//! undo
//! wait
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A failing command is
//! reported and the script continues; the exit status reflects any failure.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::debug;

use super::app::Runtime;
use super::output::Output;
use super::probe_cmd::{print_report, POLL_TICK};
use super::repo::{entry_index, lookup, print_entries};
use crate::probe::Prober;
use crate::storage::{Session, SortMode};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    List,
    Filter(String),
    Sort(SortMode),
    Reload,
    Toggle(usize),
    Delete(usize),
    Add { file: PathBuf, line: String },
    Undo,
    Backup(usize),
    Probe(usize),
    Poll,
    Wait,
}

fn parse_id(arg: Option<&str>) -> Result<usize, String> {
    let arg = arg.ok_or("missing repository id")?;
    arg.parse().map_err(|_| format!("invalid repository id: {}", arg))
}

/// Parses one script line; `Ok(None)` for blanks and comments
fn parse_step(line: &str) -> Result<Option<Step>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let first = rest.split_whitespace().next();

    let step = match command {
        "list" => Step::List,
        "filter" => Step::Filter(rest.to_string()),
        "sort" => {
            let mode = first.ok_or("missing sort mode")?;
            Step::Sort(SortMode::from_str(mode, true)?)
        }
        "reload" => Step::Reload,
        "toggle" => Step::Toggle(parse_id(first)?),
        "delete" => Step::Delete(parse_id(first)?),
        "add" => {
            let (file, line) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: add FILE LINE...")?;
            Step::Add {
                file: PathBuf::from(file),
                line: line.trim().to_string(),
            }
        }
        "undo" => Step::Undo,
        "backup" => Step::Backup(parse_id(first)?),
        "probe" => Step::Probe(parse_id(first)?),
        "poll" => Step::Poll,
        "wait" => Step::Wait,
        other => return Err(format!("unknown command: {}", other)),
    };

    Ok(Some(step))
}

fn execute(output: &Output, session: &mut Session, prober: &mut Prober, step: Step) -> Result<()> {
    match step {
        Step::List => print_entries(output, session.store()),
        Step::Filter(text) => {
            let sort = session.store().sort_mode();
            session.store_mut().rebuild_view(&text, sort);
            print_entries(output, session.store());
        }
        Step::Sort(mode) => {
            let filter = session.store().filter().to_string();
            session.store_mut().rebuild_view(&filter, mode);
            print_entries(output, session.store());
        }
        Step::Reload => {
            let count = session.reload().len();
            output.success(&format!("Reloaded {} entries.", count));
        }
        Step::Toggle(id) => output.outcome(&session.toggle_at(entry_index(id)?)?),
        Step::Delete(id) => output.outcome(&session.delete_at(entry_index(id)?)?),
        Step::Add { file, line } => output.outcome(&session.add(&file, &line)?),
        Step::Undo => output.outcome(&session.undo()?),
        Step::Backup(id) => {
            let entry = lookup(session, id)?;
            let path = session.backup_entry_file(entry)?;
            output.success(&format!("Backup created: {}", path.display()));
        }
        Step::Probe(id) => {
            let entry = lookup(session, id)?;
            if prober.request(entry) {
                output.success(&format!("Probing {}", entry.probe_key()));
            } else {
                output.success("Probe already running.");
            }
        }
        Step::Poll => match prober.poll() {
            Some(report) => print_report(output, &report),
            None if prober.is_busy() => output.success("Probe pending."),
            None => output.success("No probe running."),
        },
        Step::Wait => match prober.wait(POLL_TICK) {
            Some(report) => print_report(output, &report),
            None => output.success("No probe running."),
        },
    }
    Ok(())
}

pub fn run(output: &Output, runtime: &Runtime, script: &Path) -> Result<()> {
    let reader: Box<dyn BufRead> = if script == Path::new("-") {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(script)
            .with_context(|| format!("Failed to open script: {}", script.display()))?;
        Box::new(BufReader::new(file))
    };

    let mut session = runtime.open_session();
    let mut prober = Prober::new(runtime.probe_settings(None));
    let mut failures = 0usize;

    for (n, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read script")?;
        let lineno = n + 1;

        let step = match parse_step(&line) {
            Ok(Some(step)) => step,
            Ok(None) => continue,
            Err(msg) => {
                output.error(&format!("line {}: {}", lineno, msg));
                failures += 1;
                continue;
            }
        };

        debug!(line = lineno, ?step, "exec");
        if let Err(e) = execute(output, &mut session, &mut prober, step) {
            output.error(&format!("line {}: {:#}", lineno, e));
            failures += 1;
        }
    }

    // Deliver a probe that was started but never collected
    if let Some(report) = prober.wait(POLL_TICK) {
        print_report(output, &report);
    }

    if failures > 0 {
        anyhow::bail!("{} command(s) failed", failures);
    }
    Ok(())
}
