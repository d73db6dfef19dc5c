//! Configuration management for coin scout.
//!
//! Shared settings live in `~/.coinscout/config.json`; screener tuning lives
//! next to it in `screener.json` (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables (SCOUT_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SCOUT_LOG_LEVEL` → observability.log_level
//! - `SCOUT_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config_loader::load_modular_config;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".coinscout"),
        |dirs| dirs.home_dir().join(".coinscout"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Expand `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(raw).map_or_else(|_| raw.to_string(), |p| p.into_owned()))
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Shared configuration for every coin scout component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Outbound HTTP configuration
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load configuration from the default directory.
    pub fn load() -> Result<Self> {
        Self::load_from_dir(&config_dir())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load the merged modular configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let merged = load_modular_config(Some(dir.to_path_buf()))?;
        Self::from_value(&merged)
    }

    /// Build from an already merged configuration document.
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::deserialize(value).context("Failed to parse shared configuration")
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SCOUT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SCOUT_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to hold at `warn`.
    ///
    /// Built-in noisy modules (hyper, reqwest, h2, rustls...) are always
    /// filtered; this list adds to them.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// HTTP
// ============================================================================

/// Outbound HTTP settings shared by every REST adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, first try included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound on in-flight requests across the process
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_concurrent_requests() -> usize {
    6
}

fn default_user_agent() -> String {
    format!("coin-scout/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, "pretty");
        assert_eq!(config.http.timeout_secs, 15);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.http.retry_base_delay_ms, 1000);
        assert_eq!(config.http.max_concurrent_requests, 6);
        assert!(config.http.user_agent.starts_with("coin-scout/"));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let value = json!({
            "observability": { "level": "debug" },
            "http": { "timeout_secs": 30 },
            "screener": { "interval": "1d" }
        });
        let config = Config::from_value(&value).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.max_attempts, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"http":{"max_concurrent_requests":2}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.http.max_concurrent_requests, 2);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(&dir.path().join("absent")).unwrap();
        assert_eq!(config.http.timeout_secs, 15);
    }

    #[test]
    fn test_load_from_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_expand_path_passthrough() {
        assert_eq!(expand_path("/tmp/out.csv"), PathBuf::from("/tmp/out.csv"));
    }
}
