//! Configuration for keytally.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration, stored as JSON in the user config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file the counters are persisted to
    pub store_path: PathBuf,

    /// Seconds between periodic flushes (an hour boundary flushes earlier)
    pub flush_interval_secs: u64,

    /// How long the counting loop waits for an event before re-checking
    /// deadlines, in milliseconds
    pub idle_poll_ms: u64,

    /// Physical screen calibration for the distance report; absent means
    /// uncalibrated
    pub screen: Option<ScreenConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            store_path: home.join(".keytally.db"),
            flush_interval_secs: 300,
            idle_poll_ms: 500,
            screen: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location. A missing file means
    /// defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keytally")
            .join("config.json")
    }

    /// The store path to actually use: the CLI override when given,
    /// otherwise the configured one, with a leading `~` expanded.
    pub fn resolved_store_path(&self, cli_override: Option<&Path>) -> PathBuf {
        let path = cli_override.unwrap_or(&self.store_path);
        expand_tilde(path)
    }

    pub fn flush_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.flush_interval_secs as i64)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Physical screen calibration entered by the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub width_px: f64,
    pub height_px: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Expand a leading `~` path component against the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(stripped),
        None => path.to_path_buf(),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config format error: {0}")]
    Json(#[from] serde_json::Error),
}
