//! Empirical severity class prior.
//!
//! The risk engine weights the summed severity model output by the
//! historical frequency of each class. These helpers compute that prior
//! from encoded labels, ordered by rank.

use crash_risk_severity_models::{INVALID_LABEL, SEVERITY_CLASS_COUNT, SeverityClass};

use crate::SeverityError;

/// Counts valid labels per class, ordered by rank. Invalid labels are
/// skipped and returned as the second element.
#[must_use]
pub fn class_counts(labels: &[u8]) -> ([u64; SEVERITY_CLASS_COUNT], u64) {
    let mut counts = [0u64; SEVERITY_CLASS_COUNT];
    let mut invalid = 0u64;
    for &label in labels {
        match SeverityClass::from_rank(label) {
            Ok(class) => counts[class.index()] += 1,
            Err(_) => invalid += 1,
        }
    }
    (counts, invalid)
}

/// Normalizes per-class counts into frequencies that sum to 1.
///
/// # Errors
///
/// Returns [`SeverityError::Data`] if every count is zero.
#[allow(clippy::cast_precision_loss)]
pub fn prior_from_counts(
    counts: &[u64; SEVERITY_CLASS_COUNT],
) -> Result<[f64; SEVERITY_CLASS_COUNT], SeverityError> {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return Err(SeverityError::Data {
            message: "cannot derive a severity prior from zero labelled crashes".to_string(),
        });
    }

    let mut prior = [0.0; SEVERITY_CLASS_COUNT];
    for (slot, &count) in prior.iter_mut().zip(counts) {
        *slot = count as f64 / total as f64;
    }
    Ok(prior)
}

/// Computes the severity prior directly from encoded labels.
///
/// # Errors
///
/// Returns [`SeverityError::Data`] if no label is valid.
pub fn class_frequencies(labels: &[u8]) -> Result<[f64; SEVERITY_CLASS_COUNT], SeverityError> {
    let (counts, invalid) = class_counts(labels);
    if invalid > 0 {
        log::info!("Ignoring {invalid} labels equal to {INVALID_LABEL} when computing prior");
    }
    prior_from_counts(&counts)
}
