//! Road inventory input and control set output.

use std::io::{Read, Write};

use crash_risk_road_models::{RoadClass, Segment, SegmentId};
use serde::Deserialize;

use crate::SamplerError;
use crate::sampler::SyntheticEvent;

/// The inventory columns the sampler needs. Any others are ignored.
#[derive(Debug, Deserialize)]
struct InventoryRow {
    #[serde(rename = "STR_UNQ_ID")]
    id: SegmentId,
    #[serde(rename = "AADT_DESGN")]
    aadt: f64,
    #[serde(rename = "RU_F_SYSTE")]
    functional_system: String,
}

/// Reads road segments from a road inventory CSV.
///
/// # Errors
///
/// Returns [`SamplerError::Csv`] if a row cannot be parsed and
/// [`SamplerError::Data`] if an AADT is negative or non-finite or a
/// functional system code is unknown.
pub fn read_segments<R: Read>(reader: R) -> Result<Vec<Segment>, SamplerError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let mut segments = Vec::new();

    for result in reader.deserialize::<InventoryRow>() {
        let row = result?;
        if !row.aadt.is_finite() || row.aadt < 0.0 {
            return Err(SamplerError::data(format!(
                "segment {} has invalid AADT {}",
                row.id, row.aadt
            )));
        }
        let road_class = RoadClass::from_functional_system(&row.functional_system)
            .map_err(|e| SamplerError::data(format!("segment {}: {e}", row.id)))?;

        segments.push(Segment {
            id: row.id,
            aadt: row.aadt,
            functional_system: row.functional_system,
            road_class,
        });
    }

    log::info!("Loaded {} road segments", segments.len());
    Ok(segments)
}

/// Counts the data rows of a CSV (header excluded).
///
/// # Errors
///
/// Returns [`SamplerError::Csv`] on malformed CSV.
pub fn count_records<R: Read>(reader: R) -> Result<usize, SamplerError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut count = 0;
    for result in reader.records() {
        result?;
        count += 1;
    }
    Ok(count)
}

/// Writes the control set as a flat CSV, one row per record.
///
/// # Errors
///
/// Returns [`SamplerError::Csv`] or [`SamplerError::Io`] if writing fails.
pub fn write_events<W: Write>(events: &[SyntheticEvent], writer: W) -> Result<(), SamplerError> {
    let mut writer = csv::Writer::from_writer(writer);
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}
