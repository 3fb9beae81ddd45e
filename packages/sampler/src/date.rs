//! Calendar dates for control records.
//!
//! Control records only carry year, month and weekday. Looking up
//! historical weather needs a concrete day, so one is picked uniformly
//! among the days of that month that fall on that weekday.

use chrono::{Datelike as _, NaiveDate};
use crash_risk_road_models::Weekday;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::SamplerError;
use crate::sampler::SyntheticEvent;

/// Picks a random date in `year`/`month` that falls on `weekday`.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if the year/month is not a valid
/// calendar month.
pub fn random_date<R: Rng + ?Sized>(
    year: i32,
    month: u32,
    weekday: Weekday,
    rng: &mut R,
) -> Result<NaiveDate, SamplerError> {
    let target = chrono::Weekday::from(weekday);
    let candidates: Vec<NaiveDate> = (1..=31)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .filter(|date| date.weekday() == target)
        .collect();

    candidates
        .choose(rng)
        .copied()
        .ok_or_else(|| SamplerError::data(format!("{year}-{month:02} is not a calendar month")))
}

impl SyntheticEvent {
    /// A concrete calendar date consistent with this record's year,
    /// month and weekday.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::Data`] if the record's month is invalid.
    pub fn random_date<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NaiveDate, SamplerError> {
        random_date(self.year, self.month, self.weekday, rng)
    }
}
