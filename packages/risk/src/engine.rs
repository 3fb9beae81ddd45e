//! Route cost estimation.
//!
//! Model outputs are summed over the whole route before any scaling, so
//! the occurrence term is an aggregate exposure statistic for the trip
//! rather than a composition of independent per-segment risks.

use std::sync::Arc;

use chrono::NaiveDateTime;
use crash_risk_road_models::{OccurrenceLabel, SegmentId};
use crash_risk_severity_models::{SEVERITY_CLASS_COUNT, SeverityClass};
use crash_risk_weather::WeatherService;

use crate::RiskError;
use crate::calibration::Calibration;
use crate::classifier::{Classifier, check_probabilities};
use crate::features::{SegmentFeatures, select, temporal_features};
use crate::lookup::SegmentLookup;

/// Number of occurrence model classes (non-event, crash).
pub const OCCURRENCE_CLASS_COUNT: usize = 2;

/// Expected cost of one traversal of a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCost {
    /// Expected monetary cost.
    pub expected_cost: f64,
    /// Summed crash probability after calibration scaling.
    pub occurrence_exposure: f64,
    /// Summed severity probabilities weighted by the severity prior,
    /// indexed by rank - 1.
    pub severity_mix: [f64; SEVERITY_CLASS_COUNT],
}

impl RouteCost {
    /// The severity class contributing most to the expected cost.
    #[must_use]
    pub fn dominant_class(&self, calibration: &Calibration) -> SeverityClass {
        SeverityClass::PRECEDENCE
            .into_iter()
            .max_by(|a, b| {
                let cost = |c: &SeverityClass| {
                    self.severity_mix[c.index()] * calibration.cost_table[c.index()]
                };
                cost(a).total_cmp(&cost(b))
            })
            .unwrap_or(SeverityClass::Fatal)
    }
}

/// Combines the two models into a route cost.
///
/// All collaborators are read-only and shared, so one engine can serve
/// concurrent routes.
#[derive(Clone)]
pub struct RiskEngine {
    occurrence: Arc<dyn Classifier>,
    severity: Arc<dyn Classifier>,
    segments: Arc<dyn SegmentLookup>,
    weather: Arc<dyn WeatherService>,
    calibration: Calibration,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("calibration", &self.calibration)
            .finish_non_exhaustive()
    }
}

impl RiskEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Model`] if the occurrence model is not binary
    /// or the severity model does not have one class per severity rank,
    /// and [`RiskError::Config`] if the calibration is invalid.
    pub fn new(
        occurrence: Arc<dyn Classifier>,
        severity: Arc<dyn Classifier>,
        segments: Arc<dyn SegmentLookup>,
        weather: Arc<dyn WeatherService>,
        calibration: Calibration,
    ) -> Result<Self, RiskError> {
        if occurrence.class_count() != OCCURRENCE_CLASS_COUNT {
            return Err(RiskError::model(format!(
                "occurrence model has {} classes, expected {OCCURRENCE_CLASS_COUNT}",
                occurrence.class_count()
            )));
        }
        if severity.class_count() != SEVERITY_CLASS_COUNT {
            return Err(RiskError::model(format!(
                "severity model has {} classes, expected {SEVERITY_CLASS_COUNT}",
                severity.class_count()
            )));
        }
        calibration.validate()?;

        Ok(Self {
            occurrence,
            severity,
            segments,
            weather,
            calibration,
        })
    }

    /// Calibration in use.
    #[must_use]
    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Builds one merged feature row per route segment, in route order.
    ///
    /// Every segment is resolved before any weather is requested. Weather
    /// is then looked up once per segment for the date of `at`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Lookup`] for an unknown segment,
    /// [`RiskError::Data`] for missing weather, and
    /// [`RiskError::Upstream`] if the weather service fails.
    pub async fn assemble_features(
        &self,
        route: &[SegmentId],
        at: NaiveDateTime,
    ) -> Result<Vec<SegmentFeatures>, RiskError> {
        let temporal = temporal_features(at)?;
        let profiles = route
            .iter()
            .map(|&segment_id| {
                self.segments
                    .profile(segment_id)
                    .map(|profile| (segment_id, profile))
                    .ok_or(RiskError::Lookup { segment_id })
            })
            .collect::<Result<Vec<_>, RiskError>>()?;

        let mut rows = Vec::with_capacity(profiles.len());
        for (segment_id, profile) in profiles {
            let weather = self.weather.observe(profile.location, at.date()).await?;
            rows.push(SegmentFeatures::merge(
                segment_id,
                &profile.features,
                &temporal,
                &weather,
            ));
        }

        Ok(rows)
    }

    /// Expected cost of traversing `route` at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Data`] for an empty route or missing
    /// features, [`RiskError::Lookup`] for an unknown segment,
    /// [`RiskError::Upstream`] if weather is unavailable, and
    /// [`RiskError::Model`] if a classifier fails.
    pub async fn route_cost(
        &self,
        route: &[SegmentId],
        at: NaiveDateTime,
    ) -> Result<RouteCost, RiskError> {
        if route.is_empty() {
            return Err(RiskError::data("route has no segments"));
        }

        let rows = self.assemble_features(route, at).await?;
        let cost = self.cost_from_features(&rows)?;

        log::debug!(
            "Route of {} segments at {at}: exposure {:.6}, expected cost {:.2}",
            route.len(),
            cost.occurrence_exposure,
            cost.expected_cost
        );
        Ok(cost)
    }

    /// Expected cost of traversing `route` now, in local time.
    ///
    /// # Errors
    ///
    /// See [`Self::route_cost`].
    pub async fn route_cost_now(&self, route: &[SegmentId]) -> Result<RouteCost, RiskError> {
        self.route_cost(route, chrono::Local::now().naive_local())
            .await
    }

    /// Queries both models on assembled rows and combines their outputs.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Data`] if a model's columns are missing from
    /// a row and [`RiskError::Model`] if a model fails or returns a
    /// malformed probability table.
    pub fn cost_from_features(&self, rows: &[SegmentFeatures]) -> Result<RouteCost, RiskError> {
        let occurrence_input = select(rows, self.occurrence.feature_columns())?;
        let severity_input = select(rows, self.severity.feature_columns())?;

        let occurrence = self.occurrence.predict_proba(&occurrence_input)?;
        check_probabilities("occurrence", &occurrence, rows.len(), OCCURRENCE_CLASS_COUNT)?;
        let severity = self.severity.predict_proba(&severity_input)?;

        combine(&occurrence, &severity, &self.calibration)
    }
}

/// Folds per-segment model outputs into a route cost.
///
/// `occurrence` rows are `[P(non-event), P(crash)]`; `severity` rows hold
/// one probability per class, indexed by rank - 1.
///
/// # Errors
///
/// Returns [`RiskError::Model`] if the tables differ in length, have the
/// wrong width, or hold negative or non-finite probabilities.
pub fn combine(
    occurrence: &[Vec<f64>],
    severity: &[Vec<f64>],
    calibration: &Calibration,
) -> Result<RouteCost, RiskError> {
    let rows = occurrence.len();
    check_probabilities("occurrence", occurrence, rows, OCCURRENCE_CLASS_COUNT)?;
    check_probabilities("severity", severity, rows, SEVERITY_CLASS_COUNT)?;

    let crash = OccurrenceLabel::Crash.value() as usize;
    let crash_sum: f64 = occurrence.iter().map(|row| row[crash]).sum();
    let occurrence_exposure = crash_sum * calibration.occurrence_scale();

    let mut severity_mix = [0.0; SEVERITY_CLASS_COUNT];
    for row in severity {
        for (total, p) in severity_mix.iter_mut().zip(row) {
            *total += p;
        }
    }
    for (total, prior) in severity_mix.iter_mut().zip(calibration.severity_prior) {
        *total *= prior;
    }

    let severity_cost: f64 = severity_mix
        .iter()
        .zip(calibration.cost_table)
        .map(|(p, cost)| p * cost)
        .sum();

    Ok(RouteCost {
        expected_cost: occurrence_exposure * severity_cost,
        occurrence_exposure,
        severity_mix,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use crash_risk_road_models::Coordinates;
    use crash_risk_weather::{WeatherError, WeatherObservation};

    use super::*;
    use crate::classifier::{FeatureTable, OCCURRENCE_FEATURES, SEVERITY_FEATURES};
    use crate::lookup::{CsvLayout, SegmentProfile, SegmentTable};

    /// Returns the same probabilities for every row and records the
    /// columns it was queried with.
    struct ConstantClassifier {
        columns: Vec<String>,
        probabilities: Vec<f64>,
        seen: Mutex<Vec<String>>,
    }

    impl ConstantClassifier {
        fn new(columns: &[&str], probabilities: Vec<f64>) -> Self {
            Self {
                columns: columns.iter().map(ToString::to_string).collect(),
                probabilities,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for ConstantClassifier {
        fn feature_columns(&self) -> &[String] {
            &self.columns
        }

        fn class_count(&self) -> usize {
            self.probabilities.len()
        }

        fn predict_proba(&self, features: &FeatureTable) -> Result<Vec<Vec<f64>>, RiskError> {
            *self.seen.lock().unwrap() = features.columns().to_vec();
            Ok(vec![self.probabilities.clone(); features.len()])
        }
    }

    enum MockWeather {
        Clear,
        Empty,
        Down,
    }

    #[async_trait]
    impl WeatherService for MockWeather {
        async fn observe(
            &self,
            location: Coordinates,
            date: NaiveDate,
        ) -> Result<WeatherObservation, WeatherError> {
            match self {
                Self::Clear => Ok(WeatherObservation {
                    precipitation_rate: 0.0,
                    visibility: 10.0,
                    wind_speed: 6.0,
                }),
                Self::Empty => Err(WeatherError::EmptyResponse {
                    latitude: location.latitude,
                    longitude: location.longitude,
                    date,
                }),
                Self::Down => Err(WeatherError::Exhausted {
                    attempts: 3,
                    message: "HTTP 503".to_string(),
                }),
            }
        }
    }

    const OCCURRENCE_COLUMNS: &[&str] = &["LN_MILES", "wspd", "Time_PM_peak", "Day_Sunday"];
    const SEVERITY_COLUMNS: &[&str] = &["vis", "Time_AM_peak", "LN_MILES"];

    fn segments() -> SegmentTable {
        [1, 2, 3]
            .into_iter()
            .map(|id| {
                (
                    id,
                    SegmentProfile {
                        features: BTreeMap::from([("LN_MILES".to_string(), 0.25)]),
                        location: Coordinates {
                            latitude: 30.0,
                            longitude: -97.0,
                        },
                    },
                )
            })
            .collect()
    }

    fn calibration() -> Calibration {
        Calibration {
            normalization: 50.0,
            crash_rate_weight: 25.0,
            severity_prior: [0.25, 0.15, 0.15, 0.15, 0.15, 0.15],
            cost_table: [1_704_000.0, 98_400.0, 28_500.0, 12_500.0, 23_400.0, 4_600.0],
        }
    }

    fn fatal_engine(weather: MockWeather) -> RiskEngine {
        RiskEngine::new(
            Arc::new(ConstantClassifier::new(OCCURRENCE_COLUMNS, vec![0.0, 1.0])),
            Arc::new(ConstantClassifier::new(
                SEVERITY_COLUMNS,
                vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            )),
            Arc::new(segments()),
            Arc::new(weather),
            calibration(),
        )
        .unwrap()
    }

    fn monday_morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 3, 2)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    #[tokio::test]
    #[allow(clippy::float_cmp)]
    async fn certain_fatal_crash_on_one_segment() {
        let cost = fatal_engine(MockWeather::Clear)
            .route_cost(&[1], monday_morning())
            .await
            .unwrap();

        // 1.0 * 25 / 50 * (1.0 * 0.25 * 1_704_000)
        assert_eq!(cost.occurrence_exposure, 0.5);
        assert_eq!(cost.expected_cost, 213_000.0);
    }

    #[tokio::test]
    async fn route_sums_before_scaling() {
        let engine = fatal_engine(MockWeather::Clear);
        let one = engine.route_cost(&[1], monday_morning()).await.unwrap();
        let three = engine.route_cost(&[1, 2, 3], monday_morning()).await.unwrap();

        assert!((three.occurrence_exposure - 3.0 * one.occurrence_exposure).abs() < 1e-12);
        assert!((three.expected_cost - 9.0 * one.expected_cost).abs() < 1e-6);
        assert_eq!(
            three.dominant_class(engine.calibration()),
            SeverityClass::Fatal
        );
    }

    #[tokio::test]
    async fn models_receive_their_training_columns() {
        let occurrence = Arc::new(ConstantClassifier::new(OCCURRENCE_COLUMNS, vec![0.9, 0.1]));
        let severity = Arc::new(ConstantClassifier::new(
            SEVERITY_COLUMNS,
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
        ));
        let engine = RiskEngine::new(
            occurrence.clone(),
            severity.clone(),
            Arc::new(segments()),
            Arc::new(MockWeather::Clear),
            calibration(),
        )
        .unwrap();
        engine.route_cost(&[2], monday_morning()).await.unwrap();

        assert_eq!(*occurrence.seen.lock().unwrap(), OCCURRENCE_COLUMNS);
        assert_eq!(*severity.seen.lock().unwrap(), SEVERITY_COLUMNS);
    }

    #[tokio::test]
    async fn unknown_segment_is_lookup_error() {
        let err = fatal_engine(MockWeather::Clear)
            .route_cost(&[1, 42, 2], monday_morning())
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Lookup { segment_id: 42 }));
    }

    #[tokio::test]
    async fn unknown_segment_reported_before_weather_outage() {
        let err = fatal_engine(MockWeather::Down)
            .route_cost(&[1, 42], monday_morning())
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Lookup { segment_id: 42 }));
    }

    /// One row per `HSYS` value so every indicator the shipped models use
    /// appears somewhere in the file.
    const FULL_INVENTORY: &str = "\
STR_UNQ_ID,Latitude,Longitude,LN_MILES,AADT_TRUCK,MED_WID,NUM_LANES,ROW_MIN,S_WID_O,D_FAC,PCT_PK_CUT,INCRS_FCTR,RU,HSYS,MED_TYPE
11,30.25,-97.75,0.40,1200,16,4,120,10,55.0,9.5,1.2,1,IH,3.0
12,30.26,-97.74,0.35,300,0,2,80,4,52.0,8.0,1.1,2,FM,0.0
13,30.27,-97.73,0.80,150,0,2,60,2,50.0,7.5,1.0,4,CR,5.0
14,30.28,-97.72,0.22,900,12,4,100,8,54.0,9.0,1.3,1,US,3.0
15,30.29,-97.71,0.18,700,8,4,90,6,53.0,8.5,1.2,2,SL,0.0
16,30.30,-97.70,0.50,400,0,2,70,4,51.0,8.0,1.1,4,TL,5.0
17,30.31,-97.69,0.65,500,4,2,75,4,52.5,8.2,1.0,1,RM,0.0
";

    #[tokio::test]
    async fn shipped_model_columns_resolve_from_inventory() {
        let segments =
            SegmentTable::read_csv(FULL_INVENTORY.as_bytes(), &CsvLayout::default()).unwrap();
        let occurrence = Arc::new(ConstantClassifier::new(OCCURRENCE_FEATURES, vec![0.8, 0.2]));
        let severity = Arc::new(ConstantClassifier::new(
            SEVERITY_FEATURES,
            vec![0.05, 0.1, 0.15, 0.2, 0.2, 0.3],
        ));
        let engine = RiskEngine::new(
            occurrence.clone(),
            severity.clone(),
            Arc::new(segments),
            Arc::new(MockWeather::Clear),
            calibration(),
        )
        .unwrap();

        // 23:00 falls in the night bucket.
        let late = NaiveDate::from_ymd_opt(2020, 3, 7)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let cost = engine
            .route_cost(&[11, 12, 13, 14, 15, 16, 17], late)
            .await
            .unwrap();

        assert_eq!(*occurrence.seen.lock().unwrap(), OCCURRENCE_FEATURES);
        assert_eq!(*severity.seen.lock().unwrap(), SEVERITY_FEATURES);
        assert!(cost.expected_cost > 0.0);
        assert!((cost.occurrence_exposure - 7.0 * 0.2 * 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn empty_weather_is_data_error() {
        let err = fatal_engine(MockWeather::Empty)
            .route_cost(&[1], monday_morning())
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Data { .. }));
    }

    #[tokio::test]
    async fn exhausted_weather_is_upstream_error() {
        let err = fatal_engine(MockWeather::Down)
            .route_cost(&[1], monday_morning())
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Upstream(_)));
    }

    #[tokio::test]
    async fn empty_route_is_data_error() {
        let err = fatal_engine(MockWeather::Clear)
            .route_cost(&[], monday_morning())
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::Data { .. }));
    }

    #[tokio::test]
    async fn missing_model_column_is_data_error() {
        let engine = RiskEngine::new(
            Arc::new(ConstantClassifier::new(&["NUM_LANES"], vec![0.0, 1.0])),
            Arc::new(ConstantClassifier::new(
                SEVERITY_COLUMNS,
                vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            )),
            Arc::new(segments()),
            Arc::new(MockWeather::Clear),
            calibration(),
        )
        .unwrap();
        let err = engine.route_cost(&[1], monday_morning()).await.unwrap_err();
        assert!(err.to_string().contains("NUM_LANES"));
    }

    #[test]
    fn binary_severity_model_rejected() {
        let err = RiskEngine::new(
            Arc::new(ConstantClassifier::new(OCCURRENCE_COLUMNS, vec![0.0, 1.0])),
            Arc::new(ConstantClassifier::new(SEVERITY_COLUMNS, vec![0.5, 0.5])),
            Arc::new(segments()),
            Arc::new(MockWeather::Clear),
            calibration(),
        )
        .unwrap_err();
        assert!(matches!(err, RiskError::Model { .. }));
    }

    #[test]
    fn combine_rejects_wrong_severity_width() {
        let err = combine(&[vec![0.5, 0.5]], &[vec![0.5, 0.5]], &calibration()).unwrap_err();
        assert!(matches!(err, RiskError::Model { .. }));
    }

    #[test]
    fn combine_rejects_mismatched_rows() {
        let err = combine(
            &[vec![0.5, 0.5], vec![0.5, 0.5]],
            &[vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
            &calibration(),
        )
        .unwrap_err();
        assert!(matches!(err, RiskError::Model { .. }));
    }

    #[test]
    fn certain_no_injury_costs_least() {
        let calibration = calibration();
        let fatal = combine(&[vec![0.0, 1.0]], &[vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]], &calibration)
            .unwrap();
        let none = combine(&[vec![0.0, 1.0]], &[vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0]], &calibration)
            .unwrap();
        assert!(none.expected_cost < fatal.expected_cost);
        assert!(none.expected_cost >= 0.0);
    }
}
