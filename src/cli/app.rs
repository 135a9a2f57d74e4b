//! Main CLI application structure

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{exec, probe_cmd, repo};
use crate::domain::OsInfo;
use crate::probe::ProbeSettings;
use crate::storage::{Config, Session, SessionOptions, SortMode};

#[derive(Parser)]
#[command(name = "repoman")]
#[command(author, version, about = "Manage APT repository sources")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Filesystem root the APT paths are resolved under
    #[arg(long, global = true, env = "REPOMAN_ROOT")]
    pub root: Option<PathBuf>,

    /// Directory receiving backups before each change
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Do not back up files before changing them (wins over --backup-dir)
    #[arg(long, global = true)]
    pub no_backup: bool,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "REPOMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Refuse every change to source files
    #[arg(long, global = true)]
    pub read_only: bool,

    /// OS identifier, overriding os-release (e.g. `ubuntu`)
    #[arg(long, global = true, requires = "os_version")]
    pub os_id: Option<String>,

    /// OS version, overriding os-release (e.g. `22.04`)
    #[arg(long, global = true, requires = "os_id")]
    pub os_version: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List repository entries
    List {
        /// Only show entries containing this text (case-insensitive)
        #[arg(long)]
        filter: Option<String>,

        /// Sort order (defaults to the configured one)
        #[arg(long)]
        sort: Option<SortMode>,
    },

    /// Show one entry in detail
    Show {
        /// Entry id as printed by `list`
        id: usize,
    },

    /// Enable a disabled entry or disable an enabled one
    Toggle {
        /// Entry id as printed by `list`
        id: usize,
    },

    /// Delete an entry (the whole stanza for deb822 entries)
    Delete {
        /// Entry id as printed by `list`
        id: usize,
    },

    /// Append a one-line declaration
    Add {
        /// Full line, e.g. "deb http://archive.ubuntu.com/ubuntu focal main"
        line: String,

        /// Target file (defaults to the main sources.list)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Copy an entry's source file into the backup directory
    Backup {
        /// Entry id as printed by `list`
        id: usize,
    },

    /// Write all entries to a portable one-line file
    Export {
        /// Destination file
        path: PathBuf,
    },

    /// Append entries from an exported file, skipping known ones
    Import {
        /// File to read
        path: PathBuf,

        /// Target file (defaults to the main sources.list)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Check reachability and cached metadata of an entry
    Probe {
        /// Entry id as printed by `list`
        id: usize,

        /// Deadline for resolution and connection, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Run commands from a script (or stdin) in one session
    Exec {
        /// Script path, or `-` for stdin
        #[arg(default_value = "-")]
        script: PathBuf,
    },

    /// Show the detected OS and which formats are read
    Os,
}

/// Resolved settings shared by every command
pub struct Runtime {
    pub config: Config,
    pub os: OsInfo,
    pub read_only: bool,
    pub backups: bool,
}

impl Runtime {
    /// Merges configuration file, flags and host detection
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Config::load(cli.config.as_deref())?;
        if let Some(root) = &cli.root {
            config.root = root.clone();
        }
        if let Some(dir) = &cli.backup_dir {
            config.backup_dir = dir.clone();
        }

        let os = match (&cli.os_id, &cli.os_version) {
            (Some(id), Some(version)) => OsInfo::parse(id.as_str(), version)
                .with_context(|| format!("Invalid --os-version: {}", version))?,
            _ => detect_os(&config),
        };
        debug!(%os, root = %config.root.display(), "runtime resolved");

        Ok(Self {
            config,
            os,
            read_only: cli.read_only,
            backups: !cli.no_backup,
        })
    }

    /// Opens a session and loads every source file
    pub fn open_session(&self) -> Session {
        let mut options = SessionOptions::from_config(&self.config, self.os.clone());
        options.read_only = self.read_only;
        if !self.backups {
            options.backup_dir = None;
        }

        let mut session = Session::open(options);
        session.store_mut().rebuild_view("", self.config.sort);
        session
    }

    pub fn probe_settings(&self, timeout_ms: Option<u64>) -> ProbeSettings {
        ProbeSettings {
            timeout: timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| self.config.probe_timeout()),
            lists_dir: self.config.lists_dir(),
        }
    }
}

fn detect_os(config: &Config) -> OsInfo {
    match OsInfo::read(&config.os_release_path()) {
        Ok(os) => os,
        Err(e) => {
            warn!(error = %e, "could not detect OS, deb822 sources will be ignored");
            OsInfo::default()
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "repoman=debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = Output::new(cli.format);
    let runtime = Runtime::from_cli(&cli)?;

    match cli.command {
        Commands::List { filter, sort } => repo::list(&output, &runtime, filter.as_deref(), sort)?,
        Commands::Show { id } => repo::show(&output, &runtime, id)?,
        Commands::Toggle { id } => repo::toggle(&output, &runtime, id)?,
        Commands::Delete { id } => repo::delete(&output, &runtime, id)?,
        Commands::Add { line, file } => repo::add(&output, &runtime, &line, file)?,
        Commands::Backup { id } => repo::backup(&output, &runtime, id)?,
        Commands::Export { path } => repo::export(&output, &runtime, &path)?,
        Commands::Import { path, file } => repo::import(&output, &runtime, &path, file)?,
        Commands::Probe { id, timeout_ms } => probe_cmd::run(&output, &runtime, id, timeout_ms)?,
        Commands::Exec { script } => exec::run(&output, &runtime, &script)?,
        Commands::Os => repo::os(&output, &runtime)?,
    }

    debug!("command completed");
    Ok(())
}
