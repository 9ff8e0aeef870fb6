//! Server configuration
//!
//! Defaults overlaid by an optional TOML file, overlaid by command-line /
//! environment values (handled by the caller). The data folder follows the
//! shared resolution order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default bind port for the report service
pub const DEFAULT_PORT: u16 = 8640;

/// Default change-log poll interval for viewer streams
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_folder: PathBuf,
    pub roads_file: PathBuf,
    pub poll_interval_ms: u64,
}

/// Optional TOML overrides; absent keys keep their defaults
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    data_folder: Option<PathBuf>,
    roads_file: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
}

impl Config {
    pub fn new(data_folder: PathBuf) -> Self {
        let roads_file = data_folder.join("roads_optimized.jsonl");
        Config {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_folder,
            roads_file,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Overlay values from a TOML config file
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;

        if let Some(host) = file.host {
            self.host = host;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(data_folder) = file.data_folder {
            self.roads_file = data_folder.join("roads_optimized.jsonl");
            self.data_folder = data_folder;
        }
        if let Some(roads_file) = file.roads_file {
            self.roads_file = roads_file;
        }
        if let Some(interval) = file.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        Ok(())
    }

    /// Path of the reports database inside the data folder
    pub fn db_path(&self) -> PathBuf {
        self.data_folder.join("reports.db")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
