//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASHLY_*)
//! 2. TOML config file (if STASHLY_CONFIG_FILE set)
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
/// 1. Environment variables (STASHLY_*)
/// 2. TOML config file (if STASHLY_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the per-URL preview cache.
    ///
    /// Set via STASHLY_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Bookmark list (JSON array of entries).
    ///
    /// Set via STASHLY_DATA_FILE environment variable.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// User-Agent string for HTTP requests. Many sites reject the
    /// default agent of HTTP libraries, so this mimics a browser.
    ///
    /// Set via STASHLY_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via STASHLY_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum HTML bytes read per page.
    ///
    /// Set via STASHLY_MAX_PAGE_BYTES environment variable.
    #[serde(default = "default_max_page_bytes")]
    pub max_page_bytes: usize,

    /// Maximum bytes read per thumbnail or favicon.
    ///
    /// Set via STASHLY_MAX_IMAGE_BYTES environment variable.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Worker pool size, which is also the concurrent task limit.
    ///
    /// Set via STASHLY_WORKERS environment variable.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// `%APPDATA%/Stashly` on Windows, `~/.stashly` elsewhere.
pub fn default_base_dir() -> PathBuf {
    if cfg!(windows) {
        dirs::config_dir()
            .map(|dir| dir.join("Stashly"))
            .unwrap_or_else(|| PathBuf::from("Stashly"))
    } else {
        dirs::home_dir()
            .map(|dir| dir.join(".stashly"))
            .unwrap_or_else(|| PathBuf::from(".stashly"))
    }
}

fn default_cache_dir() -> PathBuf {
    default_base_dir().join("cache")
}

fn default_data_file() -> PathBuf {
    default_base_dir().join("data.json")
}

fn default_user_agent() -> String {
    "Mozilla/5.0".into()
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_max_page_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_image_bytes() -> usize {
    2_097_152 // 2MB
}

fn default_workers() -> usize {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            data_file: default_data_file(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_page_bytes: default_max_page_bytes(),
            max_image_bytes: default_max_image_bytes(),
            workers: default_workers(),
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
    /// 1. Environment variables prefixed with `STASHLY_`
    /// 2. TOML file from `STASHLY_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("STASHLY_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STASHLY_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.cache_dir.ends_with("cache"));
        assert!(config.data_file.ends_with("data.json"));
        assert_eq!(config.cache_dir.parent(), config.data_file.parent());
        assert_eq!(config.user_agent, "Mozilla/5.0");
        assert_eq!(config.timeout_ms, 8_000);
        assert_eq!(config.max_page_bytes, 5_242_880);
        assert_eq!(config.max_image_bytes, 2_097_152);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(8));
    }

    #[test]
    fn test_load_layers() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("stashly.toml", "timeout_ms = 5000\nworkers = 2\ncache_dir = \"/tmp/from-file\"")?;
            jail.set_env("STASHLY_CONFIG_FILE", "stashly.toml");
            jail.set_env("STASHLY_WORKERS", "8");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.timeout_ms, 5000);
            assert_eq!(config.workers, 8);
            assert_eq!(config.cache_dir, PathBuf::from("/tmp/from-file"));
            assert_eq!(config.user_agent, "Mozilla/5.0");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("STASHLY_WORKERS", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "workers"));
            Ok(())
        });
    }
}
