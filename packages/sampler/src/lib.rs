#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Synthetic control record sampler.
//!
//! The occurrence model is trained contrastively: real crashes against a
//! population of synthetic "nothing happened" records. That population
//! should look like ordinary traffic, so every dimension is drawn from a
//! traffic-exposure distribution rather than from the crash data:
//!
//! 1. segments weighted by AADT,
//! 2. months from the published monthly seasonality,
//! 3. weekday / hour pairs from the weekday × hour intensity table,
//! 4. years uniformly from a small pool.
//!
//! The dimensions are drawn independently of each other and always with
//! replacement. See [`sampler::ControlSampler`].

pub mod date;
pub mod inventory;
pub mod mix;
pub mod priors;
pub mod sampler;

use thiserror::Error;

/// Errors that can occur while loading priors or sampling control records.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Input data is malformed, missing or has zero measure.
    #[error("Data error: {message}")]
    Data {
        /// Description of what went wrong.
        message: String,
    },

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SamplerError {
    pub(crate) fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }
}
