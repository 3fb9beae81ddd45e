#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Injury severity class taxonomy.
//!
//! Crash reports carry six overlapping injury counts. Downstream models
//! work with a single ordinal label instead, whose value is the rank of
//! the class in [`SeverityClass::PRECEDENCE`]: 1 is the most severe
//! (fatal) and 6 the least severe (no injury). Label 0 is reserved for
//! records that could not be assigned a class.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of severity classes (and of raw injury count columns).
pub const SEVERITY_CLASS_COUNT: usize = 6;

/// Label value for a record with no severity class.
pub const INVALID_LABEL: u8 = 0;

/// Injury severity class, ranked from most to least severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityClass {
    /// Rank 1: at least one death
    Fatal = 1,
    /// Rank 2: suspected serious (incapacitating) injury
    Incapacitating = 2,
    /// Rank 3: non-incapacitating injury
    NonIncapacitating = 3,
    /// Rank 4: injury of unknown severity
    Unknown = 4,
    /// Rank 5: possible injury
    Possible = 5,
    /// Rank 6: no injury (property damage only)
    NoInjury = 6,
}

impl SeverityClass {
    /// Fixed precedence order, most severe first.
    ///
    /// Overlapping indicators are always resolved by walking this array;
    /// position `i` holds the class with rank `i + 1`.
    pub const PRECEDENCE: [Self; SEVERITY_CLASS_COUNT] = [
        Self::Fatal,
        Self::Incapacitating,
        Self::NonIncapacitating,
        Self::Unknown,
        Self::Possible,
        Self::NoInjury,
    ];

    /// Returns the ordinal label (1-6) for this class.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Zero-based position in [`Self::PRECEDENCE`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Creates a class from its ordinal label.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is not in the range 1-6. In
    /// particular, [`INVALID_LABEL`] is rejected.
    pub const fn from_rank(rank: u8) -> Result<Self, InvalidSeverityError> {
        match rank {
            1 => Ok(Self::Fatal),
            2 => Ok(Self::Incapacitating),
            3 => Ok(Self::NonIncapacitating),
            4 => Ok(Self::Unknown),
            5 => Ok(Self::Possible),
            6 => Ok(Self::NoInjury),
            _ => Err(InvalidSeverityError { value: rank }),
        }
    }

    /// Raw crash report column holding the count for this class.
    #[must_use]
    pub const fn count_column(self) -> &'static str {
        match self {
            Self::Fatal => "Death_Cnt",
            Self::Incapacitating => "Sus_Serious_Injry_Cnt",
            Self::NonIncapacitating => "Nonincap_Injry_Cnt",
            Self::Unknown => "Unkn_Injry_Cnt",
            Self::Possible => "Poss_Injry_Cnt",
            Self::NoInjury => "Non_Injry_Cnt",
        }
    }
}

/// Error returned when attempting to create a [`SeverityClass`] from an
/// invalid label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSeverityError {
    /// The invalid label that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity label {}: expected 1-6", self.value)
    }
}

impl std::error::Error for InvalidSeverityError {}

/// The six raw injury counts of one crash report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjuryCounts {
    /// Number of fatalities.
    #[serde(rename = "Death_Cnt")]
    pub death: u32,
    /// Number of suspected serious injuries.
    #[serde(rename = "Sus_Serious_Injry_Cnt", alias = "Incap_Injry_Cnt")]
    pub incapacitating: u32,
    /// Number of non-incapacitating injuries.
    #[serde(rename = "Nonincap_Injry_Cnt")]
    pub non_incapacitating: u32,
    /// Number of injuries of unknown severity.
    #[serde(rename = "Unkn_Injry_Cnt")]
    pub unknown: u32,
    /// Number of possible injuries.
    #[serde(rename = "Poss_Injry_Cnt")]
    pub possible: u32,
    /// Number of uninjured persons involved.
    #[serde(rename = "Non_Injry_Cnt")]
    pub none: u32,
}

impl InjuryCounts {
    /// Returns the raw count recorded for `class`.
    #[must_use]
    pub const fn count(&self, class: SeverityClass) -> u32 {
        match class {
            SeverityClass::Fatal => self.death,
            SeverityClass::Incapacitating => self.incapacitating,
            SeverityClass::NonIncapacitating => self.non_incapacitating,
            SeverityClass::Unknown => self.unknown,
            SeverityClass::Possible => self.possible,
            SeverityClass::NoInjury => self.none,
        }
    }

    /// Sets the raw count for `class`.
    pub const fn set(&mut self, class: SeverityClass, count: u32) {
        match class {
            SeverityClass::Fatal => self.death = count,
            SeverityClass::Incapacitating => self.incapacitating = count,
            SeverityClass::NonIncapacitating => self.non_incapacitating = count,
            SeverityClass::Unknown => self.unknown = count,
            SeverityClass::Possible => self.possible = count,
            SeverityClass::NoInjury => self.none = count,
        }
    }
}
