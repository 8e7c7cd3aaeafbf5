//! `snapsync.yml` configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use snapsync_core::{ErrorCode, KnownError};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "snapsync.yml";

/// Only configuration version understood so far.
const CURRENT_VERSION: u32 = 1;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Status API settings.
    #[serde(default)]
    pub status: StatusSettings,

    /// Background workers to run.
    #[serde(default = "default_workers")]
    pub workers: Vec<WorkerSettings>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_workers() -> Vec<WorkerSettings> {
    vec![WorkerSettings::default()]
}

/// Where the status API listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8099
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSettings {
    pub name: String,

    /// Seconds to sleep between iterations.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Fail every cycle with a simulated error carrying this code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulate_error: Option<ErrorCode>,

    /// Stop after this many cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

fn default_interval_secs() -> u64 {
    3600
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            name: "sync".to_string(),
            interval_secs: default_interval_secs(),
            simulate_error: None,
            max_cycles: None,
        }
    }
}

impl WorkerSettings {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            status: StatusSettings::default(),
            workers: default_workers(),
        }
    }
}

impl SyncConfig {
    /// Load and parse a config file. Does not validate.
    ///
    /// # Errors
    /// Returns error if the file is missing, unreadable, or not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        debug!(path = %path.display(), workers = config.workers.len(), "Loaded config");
        Ok(config)
    }

    /// Check every value, reporting the first invalid one.
    ///
    /// # Errors
    /// Returns `KnownError::InvalidConfigurationValue` naming the offending key.
    pub fn validate(&self) -> Result<(), KnownError> {
        if self.version != CURRENT_VERSION {
            return Err(KnownError::invalid_config("version", self.version));
        }

        if self.status.enabled && self.status.port == 0 {
            return Err(KnownError::invalid_config("status.port", self.status.port));
        }

        let mut seen = HashSet::new();
        for (index, worker) in self.workers.iter().enumerate() {
            let key = |field: &str| format!("workers[{index}].{field}");

            if worker.name.trim().is_empty() {
                return Err(KnownError::invalid_config(key("name"), &worker.name));
            }
            if !seen.insert(worker.name.as_str()) {
                return Err(KnownError::invalid_config(key("name"), &worker.name));
            }
            if worker.interval_secs == 0 {
                return Err(KnownError::invalid_config(
                    key("interval_secs"),
                    worker.interval_secs,
                ));
            }
            if worker.max_cycles == Some(0) {
                return Err(KnownError::invalid_config(key("max_cycles"), 0));
            }
        }

        Ok(())
    }
}
