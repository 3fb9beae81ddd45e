//! Static segment attributes, looked up by segment ID.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;

use crash_risk_road_models::{Coordinates, SegmentId};

use crate::RiskError;

/// Static features and centroid of one road segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentProfile {
    /// Static feature name to value.
    pub features: BTreeMap<String, f64>,
    /// Segment centroid.
    pub location: Coordinates,
}

/// Constant-time segment lookup by ID.
pub trait SegmentLookup: Send + Sync {
    /// Returns the segment's profile, or `None` if it is unknown.
    fn profile(&self, id: SegmentId) -> Option<&SegmentProfile>;
}

/// In-memory [`SegmentLookup`] backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    profiles: HashMap<SegmentId, SegmentProfile>,
}

impl SegmentTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a segment.
    pub fn insert(&mut self, id: SegmentId, profile: SegmentProfile) {
        self.profiles.insert(id, profile);
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Reads segments from a road inventory CSV.
    ///
    /// Every column other than the ID and coordinate columns becomes a
    /// feature. Numeric columns are taken as-is; columns listed in
    /// `layout.categorical` are one-hot encoded as `{column}_{value}`, and
    /// every segment gets every indicator column seen in the file.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::Csv`] on malformed CSV and [`RiskError::Data`]
    /// if a layout column is missing, an ID or coordinate is invalid, a
    /// numeric value is empty or unparsable, a categorical value is empty,
    /// or an ID repeats.
    pub fn read_csv<R: Read>(reader: R, layout: &CsvLayout) -> Result<Self, RiskError> {
        let mut reader = csv::ReaderBuilder::new().from_reader(reader);
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RiskError::data(format!("inventory is missing column '{name}'")))
        };
        let id_at = position(&layout.id_column)?;
        let lat_at = position(&layout.latitude_column)?;
        let lon_at = position(&layout.longitude_column)?;

        let mut table = Self::new();
        let mut indicators = BTreeSet::new();

        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let row = line + 1;
            let field = |at: usize| record.get(at).unwrap_or_default().trim();

            let id: SegmentId = field(id_at).parse().map_err(|_| {
                RiskError::data(format!("row {row}: invalid segment id '{}'", field(id_at)))
            })?;
            let location = Coordinates {
                latitude: parse_number(field(lat_at), row, &layout.latitude_column)?,
                longitude: parse_number(field(lon_at), row, &layout.longitude_column)?,
            };

            let mut features = BTreeMap::new();
            for (at, name) in headers.iter().enumerate() {
                if at == id_at || at == lat_at || at == lon_at {
                    continue;
                }
                if layout.categorical.iter().any(|c| c == name) {
                    let value = field(at);
                    if value.is_empty() {
                        return Err(RiskError::data(format!("row {row}: empty '{name}' value")));
                    }
                    let indicator = format!("{name}_{value}");
                    indicators.insert(indicator.clone());
                    features.insert(indicator, 1.0);
                } else {
                    features.insert(name.clone(), parse_number(field(at), row, name)?);
                }
            }

            if table.profiles.contains_key(&id) {
                return Err(RiskError::data(format!("row {row}: duplicate segment id {id}")));
            }
            table.insert(id, SegmentProfile { features, location });
        }

        for profile in table.profiles.values_mut() {
            for indicator in &indicators {
                profile.features.entry(indicator.clone()).or_insert(0.0);
            }
        }

        log::info!(
            "Loaded {} segment profiles ({} indicator columns)",
            table.len(),
            indicators.len()
        );
        Ok(table)
    }
}

impl SegmentLookup for SegmentTable {
    fn profile(&self, id: SegmentId) -> Option<&SegmentProfile> {
        self.profiles.get(&id)
    }
}

impl FromIterator<(SegmentId, SegmentProfile)> for SegmentTable {
    fn from_iter<T: IntoIterator<Item = (SegmentId, SegmentProfile)>>(iter: T) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

/// Column layout of a road inventory CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    /// Segment ID column.
    pub id_column: String,
    /// Centroid latitude column.
    pub latitude_column: String,
    /// Centroid longitude column.
    pub longitude_column: String,
    /// Columns to one-hot encode.
    pub categorical: Vec<String>,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            id_column: "STR_UNQ_ID".to_string(),
            latitude_column: "Latitude".to_string(),
            longitude_column: "Longitude".to_string(),
            categorical: vec!["RU".to_string(), "HSYS".to_string(), "MED_TYPE".to_string()],
        }
    }
}

fn parse_number(text: &str, row: usize, column: &str) -> Result<f64, RiskError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RiskError::data(format!("row {row}: invalid '{column}' value '{text}'")))
}
