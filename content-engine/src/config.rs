//! Query configuration.
//!
//! Pagination defaults and caps applied by the query assembler. Values are
//! loaded from environment variables with built-in defaults as fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: u64 = 25;

/// Largest page size a caller may request.
pub const MAX_LIMIT: u64 = 100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Pagination settings for assembled queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used when the caller supplies no limit.
    pub default_limit: u64,

    /// Limits above this value are clamped to it, including `default_limit`.
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

impl QueryConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CONTENT_QUERY_DEFAULT_LIMIT`: Page size without an explicit limit (default: 25)
    /// - `CONTENT_QUERY_MAX_LIMIT`: Largest accepted limit (default: 100)
    ///
    /// Absent or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            default_limit: std::env::var("CONTENT_QUERY_DEFAULT_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.default_limit),
            max_limit: std::env::var("CONTENT_QUERY_MAX_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_limit),
        }
    }

    /// Set the default page size.
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the maximum page size.
    pub fn with_max_limit(mut self, limit: u64) -> Self {
        self.max_limit = limit;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_limit".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.default_limit > self.max_limit {
            return Err(ConfigError::InvalidValue {
                key: "default_limit".to_string(),
                message: format!("must not exceed max_limit ({})", self.max_limit),
            });
        }

        Ok(())
    }
}
