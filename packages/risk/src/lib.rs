#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route crash risk estimation.
//!
//! Two externally trained classifiers are combined into one expected cost
//! for a route:
//!
//! 1. The occurrence model gives, per segment, the probability that a crash
//!    happens under the queried conditions.
//! 2. The severity model gives, per segment, the distribution over the six
//!    severity classes conditioned on a crash.
//!
//! Per-segment features are the segment's static attributes, weekday and
//! time-of-day indicators, and weather at the segment's coordinates. A
//! route cost is never produced from a partially missing feature row.

pub mod calibration;
pub mod classifier;
pub mod engine;
pub mod features;
pub mod lookup;

use crash_risk_road_models::SegmentId;
use crash_risk_weather::WeatherError;
use thiserror::Error;

pub use calibration::Calibration;
pub use classifier::{Classifier, FeatureTable};
pub use engine::{RiskEngine, RouteCost};
pub use lookup::{SegmentLookup, SegmentProfile, SegmentTable};

/// Errors from route risk estimation.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Missing, malformed, or zero-measure input.
    #[error("Data error: {message}")]
    Data {
        /// Description of the data problem.
        message: String,
    },

    /// A route segment is absent from the segment lookup.
    #[error("Unknown segment: {segment_id}")]
    Lookup {
        /// The segment that could not be found.
        segment_id: SegmentId,
    },

    /// The weather service failed after its retry budget.
    #[error("Weather service error: {0}")]
    Upstream(#[source] WeatherError),

    /// A classifier failed or returned an unusable probability table.
    #[error("Model error: {message}")]
    Model {
        /// Description of the model failure.
        message: String,
    },

    /// Calibration configuration is invalid.
    #[error("Calibration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiskError {
    pub(crate) fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    pub(crate) fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }
}

/// Missing weather is a data problem; everything else from the weather
/// service is an upstream failure.
impl From<WeatherError> for RiskError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::EmptyResponse { .. } | WeatherError::Incomplete { .. } => {
                Self::data(e.to_string())
            }
            other => Self::Upstream(other),
        }
    }
}
