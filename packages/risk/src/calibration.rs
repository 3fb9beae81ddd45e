//! Calibration constants for combining model outputs into a cost.
//!
//! Defaults are embedded from `calibration.toml`. The normalization
//! divisor and severity prior are empirical; they are kept configurable
//! rather than derived.

use std::path::Path;

use crash_risk_severity_models::{SEVERITY_CLASS_COUNT, SeverityClass};
use serde::Deserialize;

use crate::RiskError;

const EMBEDDED: &str = include_str!("../calibration.toml");

/// Constants applied after summing model outputs over a route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Calibration {
    /// Divisor for the summed crash probability.
    #[serde(default = "default_normalization")]
    pub normalization: f64,
    /// Global crash-rate distribution weight.
    pub crash_rate_weight: f64,
    /// Historical severity class frequencies, indexed by rank - 1.
    pub severity_prior: [f64; SEVERITY_CLASS_COUNT],
    /// Average cost per crash, indexed by rank - 1.
    pub cost_table: [f64; SEVERITY_CLASS_COUNT],
}

const fn default_normalization() -> f64 {
    50.0
}

impl Calibration {
    /// The compiled-in calibration.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the embedded TOML is invalid.
    pub fn embedded() -> Result<Self, RiskError> {
        Self::from_toml_str(EMBEDDED)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] if the document does not parse or
    /// fails [`Self::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, RiskError> {
        let calibration: Self = toml::de::from_str(text).map_err(|e| RiskError::Config {
            message: format!("invalid calibration: {e}"),
        })?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Loads calibration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Io`] if the file cannot be read and
    /// [`RiskError::Config`] if it is invalid.
    pub fn from_path(path: &Path) -> Result<Self, RiskError> {
        let text = std::fs::read_to_string(path)?;
        log::info!("Loading calibration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Checks that every constant is finite and non-negative and that the
    /// normalization divisor is positive.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Config`] naming the first offending value.
    pub fn validate(&self) -> Result<(), RiskError> {
        let invalid = |message: String| Err(RiskError::Config { message });

        if !self.normalization.is_finite() || self.normalization <= 0.0 {
            return invalid(format!(
                "normalization must be positive, got {}",
                self.normalization
            ));
        }
        if !self.crash_rate_weight.is_finite() || self.crash_rate_weight < 0.0 {
            return invalid(format!(
                "crash_rate_weight must be non-negative, got {}",
                self.crash_rate_weight
            ));
        }
        for class in SeverityClass::PRECEDENCE {
            let prior = self.severity_prior[class.index()];
            if !prior.is_finite() || prior < 0.0 {
                return invalid(format!("severity_prior for {class} is {prior}"));
            }
            let cost = self.cost_table[class.index()];
            if !cost.is_finite() || cost < 0.0 {
                return invalid(format!("cost_table for {class} is {cost}"));
            }
        }
        Ok(())
    }

    /// Scale applied to the summed crash probability.
    #[must_use]
    pub fn occurrence_scale(&self) -> f64 {
        self.crash_rate_weight / self.normalization
    }
}
