//! The control sampler and its independent draw steps.
//!
//! Each step produces exactly `n` values and is usable on its own. The
//! sampler runs them in a fixed order against one injected RNG, so a
//! seeded RNG reproduces the same control set.

use crash_risk_road_models::{OccurrenceLabel, RoadClass, Segment, SegmentId, Weekday};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::SamplerError;
use crate::priors::{MonthlyWeights, SeasonalityPriors, WeekdayHourTable};

/// One synthetic non-event record.
///
/// Serialized column names match the crash tables the occurrence model is
/// trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticEvent {
    /// Sampled segment.
    #[serde(rename = "STR_UNQ_ID")]
    pub segment_id: SegmentId,
    /// AADT of the sampled segment.
    #[serde(rename = "AADT_DESGN")]
    pub aadt: f64,
    /// Raw functional system code of the sampled segment.
    #[serde(rename = "RU_F_SYSTE")]
    pub functional_system: String,
    /// Simplified road class of the sampled segment.
    #[serde(rename = "fClassSimp")]
    pub road_class: RoadClass,
    /// Month (1-12).
    pub month: u32,
    /// Day of week, persisted as its categorical code.
    #[serde(rename = "day", with = "weekday_code")]
    pub weekday: Weekday,
    /// Hour of day (0-23).
    pub hour: u32,
    /// Year.
    pub year: i32,
    /// Occurrence target, always [`OccurrenceLabel::NonEvent`].
    pub target: u8,
}

/// Builds synthetic non-event populations from fixed seasonality priors.
#[derive(Debug, Clone)]
pub struct ControlSampler {
    priors: SeasonalityPriors,
}

impl ControlSampler {
    /// Creates a sampler over the given priors.
    #[must_use]
    pub const fn new(priors: SeasonalityPriors) -> Self {
        Self { priors }
    }

    /// The priors this sampler draws from.
    #[must_use]
    pub const fn priors(&self) -> &SeasonalityPriors {
        &self.priors
    }

    /// Draws `n` control records, where `n` is normally the number of
    /// historical crashes.
    ///
    /// Segment, month, weekday/hour and year are drawn independently and
    /// zipped index-for-index.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::Data`] if any weight vector is empty,
    /// negative, non-finite or sums to zero, or the year pool is empty.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        segments: &[Segment],
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<SyntheticEvent>, SamplerError> {
        let chosen = sample_segments(segments, n, rng)?;
        let months = assign_months(&self.priors.monthly, n, rng)?;
        let slots = assign_weekday_hours(&self.priors.weekday_hour, n, rng)?;
        let years = assign_years(&self.priors.years, n, rng)?;

        let events: Vec<SyntheticEvent> = chosen
            .into_iter()
            .zip(months)
            .zip(slots)
            .zip(years)
            .map(|(((segment, month), (weekday, hour)), year)| SyntheticEvent {
                segment_id: segment.id,
                aadt: segment.aadt,
                functional_system: segment.functional_system.clone(),
                road_class: segment.road_class,
                month,
                weekday,
                hour,
                year,
                target: OccurrenceLabel::NonEvent.value(),
            })
            .collect();

        log::info!(
            "Sampled {} control records from {} segments",
            events.len(),
            segments.len()
        );

        Ok(events)
    }
}

/// Draws `n` segments with replacement, each weighted by its share of
/// total AADT.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if there are no segments, an AADT is
/// negative or non-finite, or total AADT is zero.
pub fn sample_segments<'a, R: Rng + ?Sized>(
    segments: &'a [Segment],
    n: usize,
    rng: &mut R,
) -> Result<Vec<&'a Segment>, SamplerError> {
    let aadt: Vec<f64> = segments.iter().map(|s| s.aadt).collect();
    let total = checked_total(&aadt, "segment AADT")?;
    let dist = WeightedIndex::new(aadt.iter().map(|w| w / total))
        .map_err(|e| SamplerError::data(format!("segment AADT weights: {e}")))?;

    Ok((0..n).map(|_| &segments[dist.sample(rng)]).collect())
}

/// Assigns `n` months (1-12) following the monthly seasonality.
///
/// The expected count per month is rounded up, so the shuffled pool may
/// overshoot `n` slightly before it is truncated to exactly `n`.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if a weight is negative or non-finite,
/// or the weights sum to zero.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn assign_months<R: Rng + ?Sized>(
    monthly: &MonthlyWeights,
    n: usize,
    rng: &mut R,
) -> Result<Vec<u32>, SamplerError> {
    let total = checked_total(monthly, "monthly seasonality")?;

    let mut pool = Vec::with_capacity(n + monthly.len());
    for (month, weight) in (1u32..).zip(monthly) {
        let expected = weight / total * n as f64;
        pool.extend(std::iter::repeat_n(month, expected.ceil() as usize));
    }

    if pool.len() < n {
        return Err(SamplerError::data(format!(
            "month pool holds {} labels for {n} records",
            pool.len()
        )));
    }

    pool.shuffle(rng);
    pool.truncate(n);
    Ok(pool)
}

/// Draws `n` (weekday, hour) pairs with replacement from the flattened
/// intensity table.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if the table is empty, a weight is
/// negative or non-finite, or the table sums to zero.
pub fn assign_weekday_hours<R: Rng + ?Sized>(
    table: &WeekdayHourTable,
    n: usize,
    rng: &mut R,
) -> Result<Vec<(Weekday, u32)>, SamplerError> {
    let cells = table.cells();
    let weights: Vec<f64> = cells.iter().map(|c| c.weight).collect();
    let total = checked_total(&weights, "weekday/hour intensity")?;
    let dist = WeightedIndex::new(weights.iter().map(|w| w / total))
        .map_err(|e| SamplerError::data(format!("weekday/hour weights: {e}")))?;

    Ok((0..n)
        .map(|_| {
            let cell = cells[dist.sample(rng)];
            (cell.weekday, cell.hour)
        })
        .collect())
}

/// Draws `n` years uniformly with replacement from `pool`.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if the pool is empty.
pub fn assign_years<R: Rng + ?Sized>(
    pool: &[i32],
    n: usize,
    rng: &mut R,
) -> Result<Vec<i32>, SamplerError> {
    if pool.is_empty() {
        return Err(SamplerError::data("year pool is empty"));
    }
    Ok((0..n).map(|_| pool[rng.gen_range(0..pool.len())]).collect())
}

/// Validates a weight vector and returns its sum.
fn checked_total(weights: &[f64], what: &str) -> Result<f64, SamplerError> {
    if weights.is_empty() {
        return Err(SamplerError::data(format!("no {what} weights to sample from")));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(SamplerError::data(format!(
            "{what} weights must be finite and non-negative, found {bad}"
        )));
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SamplerError::data(format!(
            "{what} weights sum to zero, weighted sampling is undefined"
        )));
    }
    Ok(total)
}

mod weekday_code {
    use crash_risk_road_models::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(weekday.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Weekday::from_code(code)
            .map_err(|c| serde::de::Error::custom(format!("invalid weekday code {c}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix::ClassMix;
    use crate::priors::WeekdayHourCell;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn segment(id: SegmentId, aadt: f64, class: RoadClass) -> Segment {
        Segment {
            id,
            aadt,
            functional_system: class.to_string(),
            road_class: class,
        }
    }

    /// Ten busy urban segments and thirty quiet rural ones: 70% / 30% of
    /// AADT despite a 25% / 75% segment count split.
    fn two_class_network() -> Vec<Segment> {
        let mut segments: Vec<Segment> = (0..10).map(|i| segment(i, 700.0, RoadClass::U1)).collect();
        segments.extend((10..40).map(|i| segment(i, 100.0, RoadClass::R1)));
        segments
    }

    fn uniform_priors() -> SeasonalityPriors {
        let cells = crash_risk_road_models::Weekday::all()
            .iter()
            .flat_map(|&weekday| {
                (0..24).map(move |hour| WeekdayHourCell {
                    weekday,
                    hour,
                    weight: 1.0 / 168.0,
                })
            })
            .collect();
        SeasonalityPriors {
            monthly: [1.0; 12],
            weekday_hour: WeekdayHourTable::from_cells(cells).unwrap(),
            years: crate::priors::DEFAULT_YEARS.to_vec(),
        }
    }

    #[test]
    fn road_class_mix_follows_aadt() {
        let segments = two_class_network();
        let sampler = ControlSampler::new(uniform_priors());

        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let events = sampler.sample(&segments, 10_000, &mut rng).unwrap();
            let mix = ClassMix::of_events(&events);
            assert!(
                (mix.share(RoadClass::U1) - 0.7).abs() < 0.02,
                "seed {seed}: U1 share {}",
                mix.share(RoadClass::U1)
            );
            assert!((mix.share(RoadClass::R1) - 0.3).abs() < 0.02);
        }
    }

    #[test]
    fn output_has_exactly_n_rows() {
        let segments = two_class_network();
        let sampler = ControlSampler::new(uniform_priors());
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for n in [0, 1, 7, 13, 1_001] {
            let events = sampler.sample(&segments, n, &mut rng).unwrap();
            assert_eq!(events.len(), n);
        }
    }

    #[test]
    fn month_pool_is_truncated_to_n() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let uneven = [0.3, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.6];
        for n in [0, 1, 5, 99] {
            let months = assign_months(&uneven, n, &mut rng).unwrap();
            assert_eq!(months.len(), n);
            assert!(months.iter().all(|m| (1..=12).contains(m)));
        }
    }

    #[test]
    fn months_only_come_from_weighted_months() {
        let mut weights = [0.0; 12];
        weights[0] = 2.0;
        weights[11] = 2.0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let months = assign_months(&weights, 500, &mut rng).unwrap();
        assert!(months.iter().all(|&m| m == 1 || m == 12));
        assert_eq!(months.iter().filter(|&&m| m == 1).count(), 250);
    }

    #[test]
    fn zero_aadt_is_a_data_error() {
        let segments = vec![segment(1, 0.0, RoadClass::U1), segment(2, 0.0, RoadClass::R1)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for n in [0, 10] {
            let err = sample_segments(&segments, n, &mut rng).unwrap_err();
            assert!(matches!(err, SamplerError::Data { .. }));
        }
    }

    #[test]
    fn zero_monthly_weights_are_a_data_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            assign_months(&[0.0; 12], 10, &mut rng),
            Err(SamplerError::Data { .. })
        ));
    }

    #[test]
    fn negative_weight_is_a_data_error() {
        let segments = vec![segment(1, 10.0, RoadClass::U1), segment(2, -1.0, RoadClass::R1)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(sample_segments(&segments, 3, &mut rng).is_err());
    }

    #[test]
    fn empty_year_pool_is_a_data_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(assign_years(&[], 1, &mut rng).is_err());
    }

    #[test]
    fn years_come_from_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let years = assign_years(&[2018, 2019, 2020], 300, &mut rng).unwrap();
        assert_eq!(years.len(), 300);
        for year in [2018, 2019, 2020] {
            assert!(years.contains(&year));
        }
        assert!(years.iter().all(|y| (2018..=2020).contains(y)));
    }

    #[test]
    fn weekday_hour_draws_respect_zero_cells() {
        let table = WeekdayHourTable::from_cells(vec![
            WeekdayHourCell {
                weekday: Weekday::Tuesday,
                hour: 8,
                weight: 1.0,
            },
            WeekdayHourCell {
                weekday: Weekday::Sunday,
                hour: 3,
                weight: 0.0,
            },
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let slots = assign_weekday_hours(&table, 50, &mut rng).unwrap();
        assert!(slots.iter().all(|&slot| slot == (Weekday::Tuesday, 8)));
    }

    #[test]
    fn same_seed_reproduces_sample() {
        let segments = two_class_network();
        let sampler = ControlSampler::new(uniform_priors());
        let a = sampler
            .sample(&segments, 200, &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        let b = sampler
            .sample(&segments, 200, &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|e| e.target == 0));
    }
}
