//! Application configuration management.
//!
//! Configuration is stored at `~/.config/classbook/config.json`. Missing
//! fields take their defaults, and `CLASSBOOK_API_URL` /
//! `CLASSBOOK_TIMEOUT_SECS` override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::expiry::DEFAULT_COUNTDOWN_SECS;
use crate::auth::StorageBackend;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "classbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds, applied to every request.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server message that marks a 401/500 as "session expired elsewhere"
/// rather than an ordinary permission failure.
pub const SESSION_EXPIRED_SENTINEL: &str = "Phiên đăng nhập đã hết hạn";

const ENV_API_URL: &str = "CLASSBOOK_API_URL";
const ENV_TIMEOUT_SECS: &str = "CLASSBOOK_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub session_backend: StorageBackend,
    pub expiry_sentinel: String,
    pub expiry_countdown_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: REQUEST_TIMEOUT_SECS,
            session_backend: StorageBackend::default(),
            expiry_sentinel: SESSION_EXPIRED_SENTINEL.to_string(),
            expiry_countdown_secs: DEFAULT_COUNTDOWN_SECS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
        if self.timeout_secs == 0 {
            warn!(
                value = self.timeout_secs,
                "Ignoring invalid timeout_secs, using {}", REQUEST_TIMEOUT_SECS
            );
            self.timeout_secs = REQUEST_TIMEOUT_SECS;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Where the file session backend keeps its records.
    pub fn session_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find local data directory"))?;
        Ok(data_dir.join(APP_NAME).join("session"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn expiry_countdown(&self) -> Duration {
        Duration::from_secs(self.expiry_countdown_secs)
    }
}
