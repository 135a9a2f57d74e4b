//! Configuration handling for repoman
//!
//! Configuration is read from `~/.config/repoman/config.toml` (or the path
//! given with `--config`). Missing files fall back to defaults; the file is
//! never written back.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pipeline::UNDO_DEPTH;
use super::store::{SortMode, SourcesLayout};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Default probe deadline (resolution + connect)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving pre-mutation backups
    pub backup_dir: PathBuf,

    /// Initial sort mode for listings
    pub sort: SortMode,

    /// Total probe budget in milliseconds
    pub probe_timeout_ms: u64,

    /// Number of snapshots kept for undo
    pub undo_depth: usize,

    /// Filesystem root the APT paths are resolved under
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("/var/backups/repoman"),
            sort: SortMode::File,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            undo_depth: UNDO_DEPTH,
            root: PathBuf::from("/"),
        }
    }
}

impl Config {
    /// Returns the default config file location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "repoman", "repoman")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Loads configuration from `path`, or the default location if `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to load config: {}", path.display()))
    }

    /// Parses and validates TOML configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("probe_timeout_ms must be positive".into()));
        }
        if self.undo_depth == 0 {
            return Err(ConfigError::Invalid("undo_depth must be at least 1".into()));
        }
        Ok(())
    }

    /// APT source locations under the configured root
    pub fn layout(&self) -> SourcesLayout {
        SourcesLayout::under(&self.root)
    }

    /// APT's downloaded list cache under the configured root
    pub fn lists_dir(&self) -> PathBuf {
        self.root.join("var/lib/apt/lists")
    }

    /// `os-release` under the configured root
    pub fn os_release_path(&self) -> PathBuf {
        self.root.join("etc/os-release")
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.probe_timeout(), Duration::from_secs(3));
        assert_eq!(config.undo_depth, 20);
        assert_eq!(config.sort, SortMode::File);
        assert_eq!(config.layout().main_list, PathBuf::from("/etc/apt/sources.list"));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
backup_dir = "/srv/backups"
sort = "status"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.backup_dir, PathBuf::from("/srv/backups"));
        assert_eq!(config.sort, SortMode::Status);
        assert_eq!(config.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(Config::parse("probe_timeout_ms = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::parse("sort = \"random\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn root_relocates_paths() {
        let config = Config::parse("root = \"/mnt/target\"").unwrap();
        assert_eq!(config.lists_dir(), PathBuf::from("/mnt/target/var/lib/apt/lists"));
        assert_eq!(config.os_release_path(), PathBuf::from("/mnt/target/etc/os-release"));
        assert_eq!(
            config.layout().parts_dir,
            PathBuf::from("/mnt/target/etc/apt/sources.list.d")
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(dir.path().join("nope.toml").as_path())).unwrap();
        assert_eq!(config.probe_timeout_ms, DEFAULT_PROBE_TIMEOUT_MS);
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "undo_depth = 5\n").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.undo_depth, 5);
    }
}
