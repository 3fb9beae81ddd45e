//! Fitted classifier interface.
//!
//! Both models are trained outside this workspace. Each exposes the exact
//! input columns it was trained on and a pure function from a feature
//! table to per-class probabilities.

use crate::RiskError;

/// Occurrence model input columns, in training order.
pub const OCCURRENCE_FEATURES: &[&str] = &[
    "LN_MILES",
    "wspd",
    "Time_PM_peak",
    "Time_AM_peak",
    "vis",
    "AADT_TRUCK",
    "precip_hrly",
    "RU_1",
    "MED_WID",
    "MED_TYPE_0.0",
    "Time_Night/Early_Morning",
    "NUM_LANES",
    "RU_4",
    "Time_Mid_day",
    "Day_Sunday",
    "MED_TYPE_3.0",
    "ROW_MIN",
    "S_WID_O",
    "Day_Saturday",
    "D_FAC",
];

/// Severity model input columns, in training order.
pub const SEVERITY_FEATURES: &[&str] = &[
    "wspd",
    "Time_PM_peak",
    "Time_AM_peak",
    "AADT_TRUCK",
    "RU_1",
    "HSYS_CR",
    "Time_Night/Early_Morning",
    "LN_MILES",
    "PCT_PK_CUT",
    "precip_hrly",
    "Day_Sunday",
    "INCRS_FCTR",
    "RU_2",
    "D_FAC",
    "vis",
    "HSYS_IH",
    "HSYS_TL",
    "MED_TYPE_5.0",
    "HSYS_RM",
    "Day_Saturday",
    "HSYS_FM",
    "HSYS_US",
    "HSYS_SL",
    "MED_TYPE_3.0",
];

/// A dense feature table: one row per route segment, one column per
/// feature, in the order of `columns`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// Creates a table from column names and rows.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Data`] if a row's width differs from the
    /// number of columns or a value is not finite.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, RiskError> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(RiskError::data(format!(
                    "row {i} has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            if let Some((column, value)) = columns
                .iter()
                .zip(row)
                .find(|(_, value)| !value.is_finite())
            {
                return Err(RiskError::data(format!(
                    "row {i} has non-finite '{column}' = {value}"
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in route order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A fitted probabilistic classifier.
///
/// Implementations must be `Send + Sync` so a single fitted model can
/// serve concurrent route evaluations.
pub trait Classifier: Send + Sync {
    /// Input columns the model was trained on, in training order.
    fn feature_columns(&self) -> &[String];

    /// Number of output classes.
    fn class_count(&self) -> usize;

    /// Per-row class probabilities. Row `i` of the output corresponds to
    /// row `i` of `features`; column `k` to class `k`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Model`] if prediction fails.
    fn predict_proba(&self, features: &FeatureTable) -> Result<Vec<Vec<f64>>, RiskError>;
}

/// Checks a probability table returned by a classifier.
///
/// # Errors
///
/// Returns [`RiskError::Model`] if the row count or width is wrong or a
/// probability is negative or not finite.
pub(crate) fn check_probabilities(
    name: &str,
    probabilities: &[Vec<f64>],
    rows: usize,
    classes: usize,
) -> Result<(), RiskError> {
    if probabilities.len() != rows {
        return Err(RiskError::model(format!(
            "{name} model returned {} rows for {rows} segments",
            probabilities.len()
        )));
    }
    for (i, row) in probabilities.iter().enumerate() {
        if row.len() != classes {
            return Err(RiskError::model(format!(
                "{name} model returned {} classes for row {i}, expected {classes}",
                row.len()
            )));
        }
        if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(RiskError::model(format!(
                "{name} model returned probability {p} for row {i}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_table_rejected() {
        let err = FeatureTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0]],
        )
        .unwrap_err();
        assert!(matches!(err, RiskError::Data { .. }));
    }

    #[test]
    fn nan_rejected() {
        let err = FeatureTable::new(vec!["vis".to_string()], vec![vec![f64::NAN]]).unwrap_err();
        assert!(err.to_string().contains("vis"));
    }

    #[test]
    fn probability_width_checked() {
        assert!(check_probabilities("occurrence", &[vec![0.4, 0.6]], 1, 2).is_ok());
        assert!(check_probabilities("occurrence", &[vec![1.0]], 1, 2).is_err());
        assert!(check_probabilities("severity", &[], 1, 6).is_err());
        assert!(check_probabilities("severity", &[vec![-0.1, 1.1]], 1, 2).is_err());
    }

    #[test]
    fn training_schemas_have_no_duplicates() {
        for schema in [OCCURRENCE_FEATURES, SEVERITY_FEATURES] {
            let unique: std::collections::BTreeSet<_> = schema.iter().collect();
            assert_eq!(unique.len(), schema.len());
        }
    }
}
