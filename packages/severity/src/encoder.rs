//! Mutual-exclusivity encoding of injury counts.
//!
//! Each count is first reduced to a presence indicator. The indicators
//! are then walked in [`SeverityClass::PRECEDENCE`] order and the first
//! one set wins: every other indicator of the record is cleared. The
//! label is the rank of the surviving indicator, or
//! [`INVALID_LABEL`] when no count was nonzero.

use crash_risk_severity_models::{
    INVALID_LABEL, InjuryCounts, SEVERITY_CLASS_COUNT, SeverityClass,
};

/// Presence indicators indexed by precedence position (0 = fatal).
pub type Indicators = [u8; SEVERITY_CLASS_COUNT];

/// Reduces raw counts to presence indicators.
#[must_use]
pub fn binarize(counts: &InjuryCounts) -> Indicators {
    let mut indicators = [0u8; SEVERITY_CLASS_COUNT];
    for class in SeverityClass::PRECEDENCE {
        indicators[class.index()] = u8::from(counts.count(class) != 0);
    }
    indicators
}

/// Clears every indicator below the most severe one that is set.
#[must_use]
pub fn make_exclusive(mut indicators: Indicators) -> Indicators {
    let mut winner_found = false;
    for class in SeverityClass::PRECEDENCE {
        let slot = &mut indicators[class.index()];
        if winner_found {
            *slot = 0;
        } else if *slot == 1 {
            winner_found = true;
        }
    }
    indicators
}

/// Collapses mutually exclusive indicators into a label by summing
/// rank × indicator across the row.
#[must_use]
pub fn label_of(indicators: &Indicators) -> u8 {
    SeverityClass::PRECEDENCE
        .iter()
        .map(|class| class.rank() * indicators[class.index()])
        .sum()
}

/// Encodes one crash report into its severity label (0-6).
#[must_use]
pub fn encode(counts: &InjuryCounts) -> u8 {
    label_of(&make_exclusive(binarize(counts)))
}

/// Encodes one crash report into its severity class, or `None` when the
/// record carries no injury information at all.
#[must_use]
pub fn classify(counts: &InjuryCounts) -> Option<SeverityClass> {
    match encode(counts) {
        INVALID_LABEL => None,
        label => SeverityClass::from_rank(label).ok(),
    }
}
