//! Client configuration.
//!
//! [`SyncSettings`] tunes the coordinator. [`ClientConfig`] is the on-disk
//! JSON file used by the CLI to locate the remote journal database;
//! environment variables override file values.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::ReplicaConfig;
use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Default number of entries per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Replica auto-sync interval when the config does not set one
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

pub const DATABASE_URL_ENV: &str = "DAYLINE_DATABASE_URL";
pub const AUTH_TOKEN_ENV: &str = "DAYLINE_AUTH_TOKEN";

/// Coordinator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Entries fetched per page; `has_more` is true while pages come back full
    pub page_size: usize,
    /// How many entries of the first page the local cache keeps
    pub cache_page_limit: usize,
}

impl SyncSettings {
    #[must_use]
    pub const fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            cache_page_limit: page_size,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

/// Persisted client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Remote journal URL (e.g., `libsql://journal.turso.io`)
    #[serde(default)]
    pub database_url: Option<String>,
    /// Remote journal auth token
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Page size override
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Replica auto-sync interval in seconds; 0 disables automatic sync
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

impl ClientConfig {
    /// Load from `path`; a missing file yields the default config.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(error.into()),
        }
    }

    /// Parse a JSON payload.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.normalized()
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(DATABASE_URL_ENV).ok(),
            std::env::var(AUTH_TOKEN_ENV).ok(),
        )
    }

    fn with_overrides(mut self, database_url: Option<String>, auth_token: Option<String>) -> Self {
        if let Some(url) = normalize_text_option(database_url) {
            self.database_url = Some(url);
        }
        if let Some(token) = normalize_text_option(auth_token) {
            self.auth_token = Some(token);
        }
        self
    }

    fn normalized(self) -> Result<Self> {
        if self.page_size == Some(0) {
            return Err(Error::Config("page_size must be greater than 0".to_string()));
        }
        Ok(Self {
            database_url: normalize_text_option(self.database_url),
            auth_token: normalize_text_option(self.auth_token),
            page_size: self.page_size,
            sync_interval_secs: self.sync_interval_secs,
        })
    }

    /// Coordinator settings derived from this config
    pub fn sync_settings(&self) -> SyncSettings {
        self.page_size
            .map_or_else(SyncSettings::default, SyncSettings::with_page_size)
    }

    /// Embedded-replica config when both URL and token are present
    pub fn replica_config(&self) -> Option<ReplicaConfig> {
        let (Some(url), Some(token)) = (&self.database_url, &self.auth_token) else {
            return None;
        };
        let interval = match self.sync_interval_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_SYNC_INTERVAL),
        };
        Some(ReplicaConfig::new(url.as_str(), token.as_str()).with_sync_interval(interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let error = ClientConfig::parse(r#"{"database_url": "libsql://x", "colour": "red"}"#)
            .unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn test_parse_normalizes_blank_values() {
        let config =
            ClientConfig::parse(r#"{"database_url": "  ", "auth_token": " token "}"#).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.auth_token.as_deref(), Some("token"));
        assert!(config.replica_config().is_none());
    }

    #[test]
    fn test_parse_rejects_zero_page_size() {
        assert!(ClientConfig::parse(r#"{"page_size": 0}"#).is_err());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let config = ClientConfig {
            database_url: Some("libsql://file.turso.io".to_string()),
            auth_token: Some("file-token".to_string()),
            page_size: Some(5),
            sync_interval_secs: None,
        }
        .with_overrides(Some("libsql://env.turso.io".to_string()), Some("  ".to_string()));

        assert_eq!(config.database_url.as_deref(), Some("libsql://env.turso.io"));
        assert_eq!(config.auth_token.as_deref(), Some("file-token"));
        assert_eq!(config.sync_settings(), SyncSettings::with_page_size(5));
        let replica = config.replica_config().unwrap();
        assert_eq!(replica.sync_interval, Some(DEFAULT_SYNC_INTERVAL));
    }

    #[test]
    fn test_zero_sync_interval_disables_auto_sync() {
        let config = ClientConfig::parse(
            r#"{"database_url": "libsql://x.turso.io", "auth_token": "t", "sync_interval_secs": 0}"#,
        )
        .unwrap();
        assert_eq!(config.replica_config().unwrap().sync_interval, None);

        let config = ClientConfig {
            sync_interval_secs: Some(15),
            ..config
        };
        assert_eq!(
            config.replica_config().unwrap().sync_interval,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_load_missing_file_is_default_and_save_roundtrips() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("dayline").join("config.json");
        assert_eq!(ClientConfig::load(&path).unwrap(), ClientConfig::default());

        let config = ClientConfig {
            page_size: Some(10),
            ..ClientConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_default_settings_cache_one_page() {
        let settings = SyncSettings::default();
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.cache_page_limit, DEFAULT_PAGE_SIZE);
    }
}
