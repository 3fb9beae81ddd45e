//! Road class mix summaries.
//!
//! Used to compare three distributions: how segments are spread over
//! road classes, how traffic (AADT) is spread over them, and how the
//! resampled control population ends up. The last should track the
//! second, not the first.

use std::collections::BTreeMap;

use crash_risk_road_models::{RoadClass, Segment};

use crate::sampler::SyntheticEvent;

/// Fraction of some total attributed to each road class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassMix {
    shares: BTreeMap<RoadClass, f64>,
}

impl ClassMix {
    /// Share of segments per class, by count.
    #[must_use]
    pub fn of_segment_counts(segments: &[Segment]) -> Self {
        Self::from_weighted(segments.iter().map(|s| (s.road_class, 1.0)))
    }

    /// Share of total AADT per class.
    #[must_use]
    pub fn of_aadt(segments: &[Segment]) -> Self {
        Self::from_weighted(segments.iter().map(|s| (s.road_class, s.aadt)))
    }

    /// Share of control records per class.
    #[must_use]
    pub fn of_events(events: &[SyntheticEvent]) -> Self {
        Self::from_weighted(events.iter().map(|e| (e.road_class, 1.0)))
    }

    fn from_weighted(items: impl Iterator<Item = (RoadClass, f64)>) -> Self {
        let mut shares: BTreeMap<RoadClass, f64> = BTreeMap::new();
        for (class, weight) in items {
            *shares.entry(class).or_default() += weight;
        }

        let total: f64 = shares.values().sum();
        if total > 0.0 {
            for share in shares.values_mut() {
                *share /= total;
            }
        }
        Self { shares }
    }

    /// Fraction (0-1) attributed to `class`; zero if absent.
    #[must_use]
    pub fn share(&self, class: RoadClass) -> f64 {
        self.shares.get(&class).copied().unwrap_or_default()
    }

    /// One-line summary in percent, in [`RoadClass::all`] order.
    #[must_use]
    pub fn describe(&self) -> String {
        RoadClass::all()
            .iter()
            .map(|class| format!("{class} {:.1}%", self.share(*class) * 100.0))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(class: RoadClass, aadt: f64) -> Segment {
        Segment {
            id: 0,
            aadt,
            functional_system: class.to_string(),
            road_class: class,
        }
    }

    #[test]
    fn counts_and_aadt_differ() {
        let segments = vec![
            segment(RoadClass::U1, 900.0),
            segment(RoadClass::RO, 50.0),
            segment(RoadClass::RO, 50.0),
            segment(RoadClass::RO, 0.0),
        ];
        let by_count = ClassMix::of_segment_counts(&segments);
        let by_aadt = ClassMix::of_aadt(&segments);

        assert!((by_count.share(RoadClass::RO) - 0.75).abs() < 1e-12);
        assert!((by_aadt.share(RoadClass::U1) - 0.9).abs() < 1e-12);
        assert!(by_aadt.share(RoadClass::R4).abs() < f64::EPSILON);
    }

    #[test]
    fn describe_lists_every_class() {
        let mix = ClassMix::of_segment_counts(&[segment(RoadClass::U4, 1.0)]);
        let text = mix.describe();
        assert!(text.starts_with("U1 0.0%"));
        assert!(text.contains("U4 100.0%"));
        assert_eq!(text.matches('%').count(), 6);
    }
}
