//! Class balancing for severity model training.
//!
//! Severity labels are heavily skewed towards "no injury". Before
//! training, every class is resampled with replacement to the mean class
//! size, which under-samples the majority classes and over-samples the
//! rare ones.

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;

/// Resamples `rows` so that each distinct label appears exactly
/// `floor(mean class count)` times.
///
/// Classes are emitted in ascending label order. Draws are with
/// replacement, so small classes repeat rows.
pub fn balance_classes<T, R>(rows: &[T], label: impl Fn(&T) -> u8, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut by_label: BTreeMap<u8, Vec<&T>> = BTreeMap::new();
    for row in rows {
        by_label.entry(label(row)).or_default().push(row);
    }

    if by_label.is_empty() {
        return Vec::new();
    }

    let per_class = rows.len() / by_label.len();
    log::debug!(
        "Balancing {} rows across {} classes to {per_class} rows each",
        rows.len(),
        by_label.len()
    );

    let mut balanced = Vec::with_capacity(per_class * by_label.len());
    for members in by_label.values() {
        for _ in 0..per_class {
            if let Some(row) = members.choose(rng) {
                balanced.push((*row).clone());
            }
        }
    }
    balanced
}
