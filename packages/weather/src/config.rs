//! Weather service configuration.
//!
//! Defaults are embedded at compile time from `weather.toml`; a
//! deployment can supply its own file with [`WeatherConfig::from_path`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::WeatherError;
use crate::retry::RetryPolicy;

const EMBEDDED: &str = include_str!("../weather.toml");

/// Connection and retry settings for the historical observations API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherConfig {
    /// API base URL (e.g., `"https://api.weather.com"`).
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per lookup, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

impl WeatherConfig {
    /// The compiled-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the embedded TOML is invalid.
    pub fn embedded() -> Result<Self, WeatherError> {
        Self::from_toml_str(EMBEDDED)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the document does not parse or
    /// `max_attempts` is zero.
    pub fn from_toml_str(text: &str) -> Result<Self, WeatherError> {
        let config: Self = toml::de::from_str(text).map_err(|e| WeatherError::Config {
            message: format!("invalid weather config: {e}"),
        })?;
        if config.max_attempts == 0 {
            return Err(WeatherError::Config {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Config`] if the file cannot be read or is
    /// invalid.
    pub fn from_path(path: &Path) -> Result<Self, WeatherError> {
        let text = std::fs::read_to_string(path).map_err(|e| WeatherError::Config {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub(crate) const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }
}
