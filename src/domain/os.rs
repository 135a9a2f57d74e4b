//! Host OS identification
//!
//! The deb822 `.sources` format is only read on releases whose APT defaults
//! to it (Ubuntu 22.04+, Debian 12+). Older hosts ignore `.sources` files.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsInfoError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid OS version: {0}")]
    InvalidVersion(String),
}

/// OS identifier and numeric version, as found in `os-release`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsInfo {
    pub id: String,
    pub version: f64,
}

impl Default for OsInfo {
    fn default() -> Self {
        Self {
            id: "unknown".to_string(),
            version: 0.0,
        }
    }
}

impl OsInfo {
    pub fn new(id: impl Into<String>, version: f64) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Builds an `OsInfo` from a textual version such as `"22.04"`
    pub fn parse(id: impl Into<String>, version: &str) -> Result<Self, OsInfoError> {
        let version = version
            .trim()
            .trim_matches('"')
            .parse::<f64>()
            .map_err(|_| OsInfoError::InvalidVersion(version.to_string()))?;
        Ok(Self::new(id, version))
    }

    /// Parses the contents of an `os-release` file
    ///
    /// Unknown keys are ignored. A missing or unparseable `VERSION_ID`
    /// leaves the version at 0, which disables deb822 parsing.
    pub fn from_os_release(content: &str) -> Self {
        let mut info = Self::default();

        for line in content.lines() {
            if let Some(id) = line.strip_prefix("ID=") {
                info.id = id.trim().replace('"', "");
            } else if let Some(version) = line.strip_prefix("VERSION_ID=") {
                if let Ok(v) = version.trim().replace('"', "").parse::<f64>() {
                    info.version = v;
                }
            }
        }

        info
    }

    /// Reads and parses an `os-release` file
    pub fn read(path: &Path) -> Result<Self, OsInfoError> {
        let content = fs::read_to_string(path).map_err(|source| OsInfoError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_os_release(&content))
    }

    /// Returns true if the host's package manager defaults to deb822
    pub fn supports_deb822(&self) -> bool {
        match self.id.as_str() {
            "ubuntu" => self.version >= 22.04,
            "debian" => self.version >= 12.0,
            _ => false,
        }
    }
}

impl fmt::Display for OsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.id, self.version)
    }
}
