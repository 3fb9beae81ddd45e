//! Per-segment feature rows.
//!
//! A row merges four groups: static segment attributes, weekday
//! indicators, time-of-day indicators, and weather covariates. Models
//! then select their own training columns from the merged rows.

use std::collections::BTreeMap;

use chrono::{Datelike as _, NaiveDateTime, Timelike as _};
use crash_risk_road_models::{SegmentId, TimeOfDay, Weekday};
use crash_risk_weather::WeatherObservation;

use crate::RiskError;
use crate::classifier::FeatureTable;

/// One-hot weekday and time-of-day indicators for `at`.
///
/// Every weekday and bucket column is present; exactly one of each group
/// is 1.0.
///
/// # Errors
///
/// Returns [`RiskError::Data`] if the hour cannot be bucketed.
pub fn temporal_features(at: NaiveDateTime) -> Result<Vec<(&'static str, f64)>, RiskError> {
    let weekday = Weekday::from(at.weekday());
    let bucket = TimeOfDay::from_hour(at.hour())
        .map_err(|hour| RiskError::data(format!("hour {hour} is outside 0-23")))?;

    let days = Weekday::all()
        .iter()
        .map(|day| (day.column(), indicator(*day == weekday)));
    let buckets = TimeOfDay::all()
        .iter()
        .map(|b| (b.column(), indicator(*b == bucket)));

    Ok(days.chain(buckets).collect())
}

const fn indicator(active: bool) -> f64 {
    if active { 1.0 } else { 0.0 }
}

/// Merged features for one route segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFeatures {
    /// The segment these features describe.
    pub segment_id: SegmentId,
    /// Feature name to value.
    pub values: BTreeMap<String, f64>,
}

impl SegmentFeatures {
    /// Merges static, temporal and weather features into one row.
    #[must_use]
    pub fn merge(
        segment_id: SegmentId,
        static_features: &BTreeMap<String, f64>,
        temporal: &[(&'static str, f64)],
        weather: &WeatherObservation,
    ) -> Self {
        let mut values = static_features.clone();
        for (name, value) in temporal.iter().chain(weather.features().iter()) {
            values.insert((*name).to_string(), *value);
        }
        Self { segment_id, values }
    }
}

/// Builds a model input table with exactly `columns`, in order.
///
/// # Errors
///
/// Returns [`RiskError::Data`] if any row lacks one of the columns or
/// holds a non-finite value.
pub fn select(rows: &[SegmentFeatures], columns: &[String]) -> Result<FeatureTable, RiskError> {
    let table = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    row.values.get(column).copied().ok_or_else(|| {
                        RiskError::data(format!(
                            "segment {} is missing feature '{column}'",
                            row.segment_id
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, RiskError>>()
        })
        .collect::<Result<Vec<_>, RiskError>>()?;

    FeatureTable::new(columns.to_vec(), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        // 2020-03-07 is a Saturday.
        NaiveDate::from_ymd_opt(2020, 3, 7)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn value(features: &[(&'static str, f64)], name: &str) -> f64 {
        features.iter().find(|(n, _)| *n == name).unwrap().1
    }

    #[test]
    fn temporal_one_hot_groups() {
        let features = temporal_features(at(8)).unwrap();
        assert_eq!(features.len(), 11);
        assert!((value(&features, "Day_Saturday") - 1.0).abs() < f64::EPSILON);
        assert!(value(&features, "Day_Sunday").abs() < f64::EPSILON);
        assert!((value(&features, "Time_AM_peak") - 1.0).abs() < f64::EPSILON);
        let active: f64 = features.iter().map(|(_, v)| v).sum();
        assert!((active - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn late_evening_is_night() {
        let features = temporal_features(at(22)).unwrap();
        assert!((value(&features, "Time_Night/Early_Morning") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn select_orders_columns_and_reports_missing() {
        let weather = WeatherObservation {
            precipitation_rate: 0.0,
            visibility: 10.0,
            wind_speed: 4.0,
        };
        let statics = BTreeMap::from([("LN_MILES".to_string(), 0.5)]);
        let row = SegmentFeatures::merge(9, &statics, &temporal_features(at(16)).unwrap(), &weather);

        let columns = vec![
            "wspd".to_string(),
            "Time_PM_peak".to_string(),
            "LN_MILES".to_string(),
        ];
        let table = select(std::slice::from_ref(&row), &columns).unwrap();
        assert_eq!(table.rows(), &[vec![4.0, 1.0, 0.5]]);

        let err = select(&[row], &["NUM_LANES".to_string()]).unwrap_err();
        assert!(err.to_string().contains("segment 9"));
        assert!(err.to_string().contains("NUM_LANES"));
    }
}
