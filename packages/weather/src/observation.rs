//! Observation payload parsing and selection.
//!
//! The historical observations endpoint returns a day's worth of
//! readings under an `observations` array. Serving-time lookups use the
//! latest reading; historical events use the reading closest in time.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::WeatherError;

/// Feature column for hourly precipitation rate.
pub const PRECIPITATION_COLUMN: &str = "precip_hrly";
/// Feature column for visibility.
pub const VISIBILITY_COLUMN: &str = "vis";
/// Feature column for wind speed.
pub const WIND_SPEED_COLUMN: &str = "wspd";

/// The three weather covariates used by the models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherObservation {
    /// Hourly precipitation rate.
    pub precipitation_rate: f64,
    /// Visibility.
    pub visibility: f64,
    /// Wind speed.
    pub wind_speed: f64,
}

impl WeatherObservation {
    /// Feature name / value pairs in the order the models were trained.
    #[must_use]
    pub const fn features(&self) -> [(&'static str, f64); 3] {
        [
            (PRECIPITATION_COLUMN, self.precipitation_rate),
            (VISIBILITY_COLUMN, self.visibility),
            (WIND_SPEED_COLUMN, self.wind_speed),
        ]
    }
}

/// One reading as returned by the service. Any field may be null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawObservation {
    /// Observation time as a Unix epoch (seconds).
    pub valid_time_gmt: Option<i64>,
    /// Hourly precipitation rate.
    pub precip_hrly: Option<f64>,
    /// Visibility.
    pub vis: Option<f64>,
    /// Wind speed.
    pub wspd: Option<f64>,
}

impl RawObservation {
    /// Observation time, if present and representable.
    #[must_use]
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.valid_time_gmt
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Converts to a complete observation.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Incomplete`] naming the first missing
    /// covariate.
    pub fn complete(&self) -> Result<WeatherObservation, WeatherError> {
        Ok(WeatherObservation {
            precipitation_rate: self.precip_hrly.ok_or(WeatherError::Incomplete {
                field: PRECIPITATION_COLUMN,
            })?,
            visibility: self.vis.ok_or(WeatherError::Incomplete {
                field: VISIBILITY_COLUMN,
            })?,
            wind_speed: self.wspd.ok_or(WeatherError::Incomplete {
                field: WIND_SPEED_COLUMN,
            })?,
        })
    }
}

/// Extracts the observation list from a response body.
///
/// A body without an `observations` key, or with a null one, yields an
/// empty list; the caller decides whether that is an error.
///
/// # Errors
///
/// Returns [`WeatherError::Parse`] if `observations` is present but is
/// not an array of observation objects.
pub fn parse_observations(body: &serde_json::Value) -> Result<Vec<RawObservation>, WeatherError> {
    match body.get("observations") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value @ serde_json::Value::Array(_)) => {
            Vec::<RawObservation>::deserialize(value).map_err(|e| WeatherError::Parse {
                message: format!("malformed observation: {e}"),
            })
        }
        Some(_) => Err(WeatherError::Parse {
            message: "'observations' is not an array".to_string(),
        }),
    }
}

/// The last reading of the day.
#[must_use]
pub fn latest(observations: &[RawObservation]) -> Option<&RawObservation> {
    observations.last()
}

/// The reading closest in time to `at`. Readings without a timestamp are
/// skipped; ties keep the earlier reading in the list.
#[must_use]
pub fn nearest(observations: &[RawObservation], at: DateTime<Utc>) -> Option<&RawObservation> {
    observations
        .iter()
        .filter_map(|obs| obs.observed_at().map(|t| ((t - at).num_seconds().abs(), obs)))
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, obs)| obs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> serde_json::Value {
        serde_json::json!({
            "metadata": {"status_code": 200},
            "observations": [
                {"valid_time_gmt": 1_583_020_800, "precip_hrly": 0.0, "vis": 10.0, "wspd": 5.0},
                {"valid_time_gmt": 1_583_042_400, "precip_hrly": 0.2, "vis": 4.0, "wspd": 12.0},
                {"valid_time_gmt": 1_583_064_000, "precip_hrly": null, "vis": 9.0, "wspd": 7.0}
            ]
        })
    }

    #[test]
    fn parses_observation_list() {
        let observations = parse_observations(&body()).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[1].wspd, Some(12.0));
        assert_eq!(observations[2].precip_hrly, None);
    }

    #[test]
    fn missing_observations_is_empty() {
        let observations = parse_observations(&serde_json::json!({"metadata": {}})).unwrap();
        assert!(observations.is_empty());
    }

    #[test]
    fn non_array_observations_is_parse_error() {
        let err = parse_observations(&serde_json::json!({"observations": 3})).unwrap_err();
        assert!(matches!(err, WeatherError::Parse { .. }));
    }

    #[test]
    fn latest_reading_with_null_field_is_incomplete() {
        let observations = parse_observations(&body()).unwrap();
        let err = latest(&observations).unwrap().complete().unwrap_err();
        assert!(matches!(
            err,
            WeatherError::Incomplete {
                field: PRECIPITATION_COLUMN
            }
        ));
    }

    #[test]
    fn nearest_uses_absolute_distance() {
        let observations = parse_observations(&body()).unwrap();
        // Two hours before the second reading, four after the first.
        let at = DateTime::<Utc>::from_timestamp(1_583_042_400 - 7_200, 0).unwrap();
        let obs = nearest(&observations, at).unwrap().complete().unwrap();
        assert!((obs.wind_speed - 12.0).abs() < f64::EPSILON);

        let before_all = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let first = nearest(&observations, before_all).unwrap();
        assert_eq!(first.valid_time_gmt, Some(1_583_020_800));
    }

    #[test]
    fn features_use_training_column_names() {
        let obs = WeatherObservation {
            precipitation_rate: 0.1,
            visibility: 8.0,
            wind_speed: 3.0,
        };
        let names: Vec<&str> = obs.features().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["precip_hrly", "vis", "wspd"]);
    }
}
