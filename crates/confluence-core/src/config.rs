//! Application configuration management.
//!
//! Configuration is stored at `~/.config/confluence/config.json`; every field
//! has a default so a missing file is fine. The API base URL can be
//! overridden with the `CONFLUENCE_API_URL` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::RetryPolicy;

/// Application name used for config/data directory paths
const APP_NAME: &str = "confluence";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "CONFLUENCE_API_URL";

/// Local-development fallback when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3333/api/v1";

/// Pause on the callback confirmation before moving to the landing route.
const DEFAULT_CALLBACK_REDIRECT_DELAY_MS: u64 = 1500;

/// First retry delay when retries are enabled; doubles on each attempt.
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// No deadline unless set.
    pub request_timeout_secs: Option<u64>,
    pub token_storage: TokenStorage,
    /// Tolerance for client clock skew when checking credential expiry.
    pub clock_skew_leeway_secs: u64,
    pub callback_redirect_delay_ms: u64,
    /// Retries for network errors, 429 and 502-504. Off unless set.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: None,
            token_storage: TokenStorage::default(),
            clock_skew_leeway_secs: 0,
            callback_redirect_delay_ms: DEFAULT_CALLBACK_REDIRECT_DELAY_MS,
            max_retries: 0,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl Config {
    /// Load from disk, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the file token store keeps the credential.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Values too large to represent saturate at the maximum duration.
    pub fn clock_skew_leeway(&self) -> chrono::Duration {
        i64::try_from(self.clock_skew_leeway_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn callback_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.callback_redirect_delay_ms)
    }

    /// Gateway-wide retry policy; requests may still override it.
    pub fn retry_policy(&self) -> RetryPolicy {
        if self.max_retries == 0 {
            return RetryPolicy::none();
        }
        RetryPolicy::exponential(self.max_retries, Duration::from_millis(self.retry_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.token_storage, TokenStorage::File);
        assert_eq!(config.clock_skew_leeway(), chrono::Duration::zero());
        assert_eq!(config.callback_redirect_delay(), Duration::from_millis(1500));
        assert_eq!(config.retry_policy(), RetryPolicy::none());
    }

    #[test]
    fn test_retry_policy_from_file() {
        let config: Config =
            serde_json::from_str(r#"{"max_retries": 3, "retry_backoff_ms": 250}"#)
                .expect("Failed to parse config JSON");
        assert_eq!(
            config.retry_policy(),
            RetryPolicy::exponential(3, Duration::from_millis(250))
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"token_storage": "keyring", "request_timeout_secs": 10}"#)
                .expect("Failed to parse config JSON");
        assert_eq!(config.token_storage, TokenStorage::Keyring);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_huge_leeway_saturates() {
        let config = Config {
            clock_skew_leeway_secs: u64::MAX,
            ..Config::default()
        };
        assert_eq!(config.clock_skew_leeway(), chrono::Duration::MAX);

        let config = Config {
            clock_skew_leeway_secs: 10_000_000_000_000_000,
            ..Config::default()
        };
        assert_eq!(config.clock_skew_leeway(), chrono::Duration::MAX);

        let config = Config {
            clock_skew_leeway_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.clock_skew_leeway(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_env_override() {
        let config = Config::default().with_env_overrides(|key| {
            (key == API_URL_ENV).then(|| "https://api.example.com/v1".to_string())
        });
        assert_eq!(config.api_base_url, "https://api.example.com/v1");

        let untouched = Config::default().with_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(untouched.api_base_url, DEFAULT_API_BASE_URL);
    }
}
