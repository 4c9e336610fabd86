//! Application configuration management.
//!
//! This module handles loading the application configuration:
//! where identity data is stored, whether it is encrypted at rest, the
//! release feed to poll and transport timeouts.
//!
//! Configuration is stored at `~/.config/sessionvault/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::{EncryptedStore, JsonFileStore, KeyValueStore, KeyringStore};

/// Application name used for config/data directory paths
const APP_NAME: &str = "sessionvault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the store passphrase when encryption is on
pub const PASSPHRASE_ENV: &str = "SESSIONVAULT_PASSPHRASE";

const DEFAULT_RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/sessionvault/sessionvault/releases/latest";

/// Long enough for startup navigation to settle before a prompt can appear.
const DEFAULT_UPDATE_CHECK_DELAY_SECS: u64 = 3;

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub release_feed_url: String,
    pub update_check_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub store_backend: StoreBackend,
    /// Overrides the default `store.json` location for the file backend
    pub store_path: Option<PathBuf>,
    pub encrypt_store: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release_feed_url: DEFAULT_RELEASE_FEED_URL.to_string(),
            update_check_delay_secs: DEFAULT_UPDATE_CHECK_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store_backend: StoreBackend::default(),
            store_path: None,
            encrypt_store: false,
            log_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_json(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.store_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME).join(crate::store::file::STORE_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn update_check_delay(&self) -> Duration {
        Duration::from_secs(self.update_check_delay_secs)
    }

    /// Build the configured store, wrapped in encryption when enabled.
    ///
    /// `passphrase` is required when `encrypt_store` is set.
    pub fn open_store(&self, passphrase: Option<String>) -> Result<Box<dyn KeyValueStore>> {
        let base: Box<dyn KeyValueStore> = match self.store_backend {
            StoreBackend::File => Box::new(JsonFileStore::new(self.store_path()?)),
            StoreBackend::Keyring => Box::new(KeyringStore::default()),
        };

        if !self.encrypt_store {
            return Ok(base);
        }

        let passphrase = passphrase
            .filter(|p| !p.is_empty())
            .with_context(|| format!("encrypt_store is enabled but {} is not set", PASSPHRASE_ENV))?;
        Ok(Box::new(EncryptedStore::new(base, passphrase)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_json(r#"{"store_backend":"keyring","update_check_delay_secs":5}"#)
            .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Keyring);
        assert_eq!(config.update_check_delay(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
        assert_eq!(config.release_feed_url, DEFAULT_RELEASE_FEED_URL);
        assert!(!config.encrypt_store);
    }

    #[test]
    fn test_store_path_override() {
        let config = Config {
            store_path: Some(PathBuf::from("/tmp/sv/store.json")),
            ..Config::default()
        };
        assert_eq!(config.store_path().unwrap(), PathBuf::from("/tmp/sv/store.json"));
    }

    #[test]
    fn test_encryption_requires_passphrase() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            store_path: Some(dir.path().join("store.json")),
            encrypt_store: true,
            ..Config::default()
        };
        assert!(config.open_store(None).is_err());
        assert!(config.open_store(Some(String::new())).is_err());
        assert!(config.open_store(Some("pass".to_string())).is_ok());
    }
}
