//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MAX_BYTES_LIMIT: usize = 50 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn check_bytes(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
    }
    if value > MAX_BYTES_LIMIT {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 50MB".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_dir` or `user_agent` is empty
    /// - `max_page_bytes` / `max_image_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `workers` is 0 or more than 64
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_dir".into(), reason: "must not be empty".into() });
        }

        check_bytes("max_page_bytes", self.max_page_bytes)?;
        check_bytes("max_image_bytes", self.max_image_bytes)?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.workers == 0 || self.workers > 64 {
            return Err(ConfigError::Invalid { field: "workers".into(), reason: "must be between 1 and 64".into() });
        }

        if self.timeout_ms > 30_000 {
            tracing::warn!(timeout_ms = self.timeout_ms, "long fetch timeout; slow sites will hold a worker");
        }

        Ok(())
    }
}
