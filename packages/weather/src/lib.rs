#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weather covariates for road segments.
//!
//! The risk engine needs precipitation rate, visibility and wind speed
//! at a segment's coordinates for a given date. Any source implementing
//! [`WeatherService`] can provide them; [`client::WeatherComClient`]
//! queries the historical observations HTTP API with bounded retry.
//!
//! Missing data is never filled in: an empty observation list or an
//! observation lacking one of the three covariates is an error.

pub mod client;
pub mod config;
pub mod observation;
mod retry;

use async_trait::async_trait;
use chrono::NaiveDate;
use crash_risk_road_models::Coordinates;
use thiserror::Error;

pub use observation::WeatherObservation;

/// Errors from weather lookups.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed with a non-retryable error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-retryable status.
    #[error("Weather service rejected request: HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The service returned no observations for the location and date.
    #[error("No weather observations for ({latitude}, {longitude}) on {date}")]
    EmptyResponse {
        /// Queried latitude.
        latitude: f64,
        /// Queried longitude.
        longitude: f64,
        /// Queried date.
        date: NaiveDate,
    },

    /// The selected observation lacks a required covariate.
    #[error("Weather observation is missing '{field}'")]
    Incomplete {
        /// Name of the missing field.
        field: &'static str,
    },

    /// Every attempt failed with a transient error.
    #[error("Weather service unavailable after {attempts} attempts: {message}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Last transient failure.
        message: String,
    },

    /// Service configuration is invalid or incomplete.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },
}

/// A source of weather covariates.
///
/// Implementations must be `Send + Sync` so one instance can serve
/// concurrent route evaluations.
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Returns the most recent observation at `location` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if the lookup fails or yields no
    /// complete observation.
    async fn observe(
        &self,
        location: Coordinates,
        date: NaiveDate,
    ) -> Result<WeatherObservation, WeatherError>;
}
