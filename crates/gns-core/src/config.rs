//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the server URL, where the session is persisted, request timeouts
//! and the last used username.
//!
//! Configuration is stored at `~/.config/gns-dashboard/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, Storage};

/// Application name used for config/data directory paths
const APP_NAME: &str = "gns-dashboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Prefix every dashboard endpoint lives under
pub const API_PREFIX: &str = "/api/v1";

/// Environment variable overriding `server_url`
pub const ENV_API_URL: &str = "GNS_API_URL";

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Dashboard requests are small; fail fast.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Notification submissions may carry attachments, so they get longer.
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub storage: StorageKind,
    pub last_username: Option<String>,
    pub request_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub rate_limit_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            storage: StorageKind::default(),
            last_username: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            rate_limit_retries: 0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
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

    /// Apply environment overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var(ENV_API_URL).ok().filter(|u| !u.trim().is_empty()) {
            self.server_url = url;
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn session_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Base URL of the dashboard API, e.g. `http://localhost:8080/api/v1`
    pub fn api_base_url(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), API_PREFIX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Build the session storage backend this config selects
    pub fn open_storage(&self) -> Result<Arc<dyn Storage>> {
        Ok(match self.storage {
            StorageKind::File => Arc::new(FileStorage::new(Self::session_dir()?)),
            StorageKind::Keyring => Arc::new(KeyringStorage),
        })
    }
}
