#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Injury severity encoding for the severity model.
//!
//! Crash reports record six overlapping injury counts. The [`encoder`]
//! collapses them into one ordinal label by strict precedence (a single
//! fatality outranks any number of lesser injuries), [`table`] applies
//! that to whole crash CSV files, and [`balance`] / [`prior`] prepare the
//! labelled rows for training and calibration.

pub mod balance;
pub mod encoder;
pub mod prior;
pub mod table;

use thiserror::Error;

/// Errors that can occur while encoding or preparing severity data.
#[derive(Debug, Error)]
pub enum SeverityError {
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
