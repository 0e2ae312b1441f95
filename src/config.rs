//! Configuration for fuelbank

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fuelbank")
}

/// Which ledger store to open at startup.
///
/// Both backends speak the same SQL; the choice is made once from
/// configuration, never inspected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// File-backed SQLite under the data directory
    #[default]
    File,
    /// In-memory SQLite, for tests and throwaway runs
    Memory,
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for the ledger database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage backend selected at startup
    #[serde(default)]
    pub backend: StorageBackend,

    /// Maximum task requests a student may submit per week
    #[serde(default = "default_weekly_request_limit")]
    pub weekly_request_limit: u32,

    /// Default number of operation log rows returned by listings
    #[serde(default = "default_oplog_limit")]
    pub oplog_limit: u32,
}

fn default_weekly_request_limit() -> u32 {
    20
}

fn default_oplog_limit() -> u32 {
    200
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: StorageBackend::File,
            weekly_request_limit: 20,
            oplog_limit: 200,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get ledger database path
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("fuelbank.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
