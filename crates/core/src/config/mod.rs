//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CASETRACK_*)
//! 2. TOML config file (if CASETRACK_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CASETRACK_*)
/// 2. TOML config file (if CASETRACK_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Census API key for the population source.
    ///
    /// Set via CASETRACK_CENSUS_API_KEY environment variable.
    /// Required only when a census dataset actually has to be loaded.
    #[serde(default)]
    pub census_api_key: Option<String>,

    /// Path to the SQLite store.
    ///
    /// Set via CASETRACK_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL for the time-series CSV feeds.
    ///
    /// Set via CASETRACK_FEED_BASE_URL environment variable.
    #[serde(default = "default_feed_base_url")]
    pub feed_base_url: String,

    /// Endpoint for the census population API.
    ///
    /// Set via CASETRACK_CENSUS_BASE_URL environment variable.
    #[serde(default = "default_census_base_url")]
    pub census_base_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CASETRACK_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via CASETRACK_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./casetrack.sqlite")
}

fn default_feed_base_url() -> String {
    "https://raw.githubusercontent.com/nytimes/covid-19-data/master/".into()
}

fn default_census_base_url() -> String {
    "https://api.census.gov/data/2019/pep/population".into()
}

fn default_user_agent() -> String {
    "casetrack/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            census_api_key: None,
            db_path: default_db_path(),
            feed_base_url: default_feed_base_url(),
            census_base_url: default_census_base_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CASETRACK_`
    /// 2. TOML file from `CASETRACK_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CASETRACK_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CASETRACK_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that the census API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the census API key is not set.
    pub fn require_census_api_key(&self) -> Result<&str, ConfigError> {
        self.census_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "census_api_key".into(),
            hint: "Set CASETRACK_CENSUS_API_KEY environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./casetrack.sqlite"));
        assert_eq!(config.user_agent, "casetrack/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert!(config.feed_base_url.ends_with('/'));
        assert!(config.census_base_url.starts_with("https://"));
        assert!(config.census_api_key.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_require_census_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_census_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_census_api_key_present() {
        let config = AppConfig { census_api_key: Some("test-key".into()), ..Default::default() };
        let result = config.require_census_api_key();
        assert_eq!(result.unwrap(), "test-key");
    }
}
