#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road segment types and temporal encodings.
//!
//! Defines the simplified road class taxonomy derived from functional
//! system codes, the exposure record used for weighted segment sampling,
//! and the weekday / time-of-day one-hot encodings shared by the crash
//! records, the synthetic control records and serving-time feature rows.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Unique road segment identifier (`STR_UNQ_ID` in the road inventory).
pub type SegmentId = u64;

/// Simplified road classification.
///
/// Functional system codes 1-2 collapse to interstate, 3-4 to other
/// arterial and 5-7 to everything else, separately for urban and rural.
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
pub enum RoadClass {
    /// Urban interstate
    U1,
    /// Rural interstate
    R1,
    /// Urban other arterial
    U4,
    /// Rural other arterial
    R4,
    /// Other urban roads
    UO,
    /// Other rural roads
    RO,
}

impl RoadClass {
    /// Maps a raw functional system code (e.g. `"R3"`, `"U7"`) to its
    /// simplified class.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not one of `R1`-`R7` / `U1`-`U7`.
    pub fn from_functional_system(code: &str) -> Result<Self, InvalidRoadClassError> {
        match code.trim() {
            "U1" | "U2" => Ok(Self::U1),
            "U3" | "U4" => Ok(Self::U4),
            "U5" | "U6" | "U7" => Ok(Self::UO),
            "R1" | "R2" => Ok(Self::R1),
            "R3" | "R4" => Ok(Self::R4),
            "R5" | "R6" | "R7" => Ok(Self::RO),
            other => Err(InvalidRoadClassError {
                code: other.to_string(),
            }),
        }
    }

    /// Human-readable class name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::U1 => "Urban Interstate",
            Self::R1 => "Rural Interstate",
            Self::U4 => "Urban Other Arterial",
            Self::R4 => "Rural Other Arterial",
            Self::UO => "Other Urban",
            Self::RO => "Other Rural",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::U1, Self::R1, Self::U4, Self::R4, Self::UO, Self::RO]
    }
}

/// Error returned when a functional system code has no road class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRoadClassError {
    /// The unrecognized code.
    pub code: String,
}

impl std::fmt::Display for InvalidRoadClassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid functional system code '{}': expected R1-R7 or U1-U7",
            self.code
        )
    }
}

impl std::error::Error for InvalidRoadClassError {}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Exposure record for one road segment, as read from the road inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment identifier.
    pub id: SegmentId,
    /// Annual average daily traffic (design AADT).
    pub aadt: f64,
    /// Raw functional system code, kept for the persisted control set.
    pub functional_system: String,
    /// Simplified road class.
    pub road_class: RoadClass,
}

/// Day of week, in the encoding used by every crash and control record.
///
/// [`Weekday::code`] is the zero-based position starting from Monday.
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
#[strum(ascii_case_insensitive)]
pub enum Weekday {
    /// Monday.
    #[strum(to_string = "Monday", serialize = "Mon")]
    Monday,
    /// Tuesday.
    #[strum(to_string = "Tuesday", serialize = "Tue")]
    Tuesday,
    /// Wednesday.
    #[strum(to_string = "Wednesday", serialize = "Wed")]
    Wednesday,
    /// Thursday.
    #[strum(to_string = "Thursday", serialize = "Thu")]
    Thursday,
    /// Friday.
    #[strum(to_string = "Friday", serialize = "Fri")]
    Friday,
    /// Saturday.
    #[strum(to_string = "Saturday", serialize = "Sat")]
    Saturday,
    /// Sunday.
    #[strum(to_string = "Sunday", serialize = "Sun")]
    Sunday,
}

impl Weekday {
    /// Zero-based categorical code (Monday = 0).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Creates a weekday from its categorical code.
    ///
    /// # Errors
    ///
    /// Returns the offending code if it is not in the range 0-6.
    pub const fn from_code(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Monday),
            1 => Ok(Self::Tuesday),
            2 => Ok(Self::Wednesday),
            3 => Ok(Self::Thursday),
            4 => Ok(Self::Friday),
            5 => Ok(Self::Saturday),
            6 => Ok(Self::Sunday),
            other => Err(other),
        }
    }

    /// One-hot feature column name (e.g. `Day_Monday`).
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Monday => "Day_Monday",
            Self::Tuesday => "Day_Tuesday",
            Self::Wednesday => "Day_Wednesday",
            Self::Thursday => "Day_Thursday",
            Self::Friday => "Day_Friday",
            Self::Saturday => "Day_Saturday",
            Self::Sunday => "Day_Sunday",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
            Self::Sunday,
        ]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Monday => Self::Mon,
            Weekday::Tuesday => Self::Tue,
            Weekday::Wednesday => Self::Wed,
            Weekday::Thursday => Self::Thu,
            Weekday::Friday => Self::Fri,
            Weekday::Saturday => Self::Sat,
            Weekday::Sunday => Self::Sun,
        }
    }
}

/// Time-of-day traffic bucket.
///
/// Boundaries are half-open: AM peak `[07, 11)`, mid-day `[11, 15)`,
/// PM peak `[15, 20)`, everything else is night / early morning.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TimeOfDay {
    /// 07:00 to 10:59.
    AmPeak,
    /// 11:00 to 14:59.
    MidDay,
    /// 15:00 to 19:59.
    PmPeak,
    /// 20:00 to 06:59.
    NightEarlyMorning,
}

impl TimeOfDay {
    /// Buckets an hour of the day.
    ///
    /// # Errors
    ///
    /// Returns the offending hour if it is greater than 23.
    pub const fn from_hour(hour: u32) -> Result<Self, u32> {
        match hour {
            7..11 => Ok(Self::AmPeak),
            11..15 => Ok(Self::MidDay),
            15..20 => Ok(Self::PmPeak),
            0..7 | 20..24 => Ok(Self::NightEarlyMorning),
            other => Err(other),
        }
    }

    /// One-hot feature column name (e.g. `Time_AM_peak`).
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::AmPeak => "Time_AM_peak",
            Self::MidDay => "Time_Mid_day",
            Self::PmPeak => "Time_PM_peak",
            Self::NightEarlyMorning => "Time_Night/Early_Morning",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AmPeak,
            Self::MidDay,
            Self::PmPeak,
            Self::NightEarlyMorning,
        ]
    }
}

/// Contrastive target attached to every event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceLabel {
    /// Synthesized control record.
    NonEvent = 0,
    /// Historical crash.
    Crash = 1,
}

impl OccurrenceLabel {
    /// Returns the numeric target value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}
