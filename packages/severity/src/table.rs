//! Severity encoding of whole crash tables.
//!
//! Reads a crash CSV, replaces the six injury count columns with a single
//! `target` column holding the encoded label, and writes the result. All
//! other columns pass through unchanged.

use std::io::{Read, Write};

use crash_risk_severity_models::{
    INVALID_LABEL, InjuryCounts, SEVERITY_CLASS_COUNT, SeverityClass,
};

use rand::Rng;

use crate::{SeverityError, balance, encoder};

/// Name of the label column appended to the output.
pub const TARGET_COLUMN: &str = "target";

/// Older exports name the incapacitating column differently.
const INCAPACITATING_ALIAS: &str = "Incap_Injry_Cnt";

/// Totals gathered while encoding a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Data rows read from the input.
    pub rows_read: u64,
    /// Data rows written to the output.
    pub rows_written: u64,
    /// Rows whose label was [`INVALID_LABEL`].
    pub invalid: u64,
    /// Valid rows per class, ordered by rank.
    pub class_counts: [u64; SEVERITY_CLASS_COUNT],
}

/// Encodes every row of a crash CSV.
///
/// When `drop_invalid` is set, rows that end up with
/// [`INVALID_LABEL`] are left out of the output (they are still counted
/// in [`EncodeSummary::invalid`]).
///
/// # Errors
///
/// Returns [`SeverityError::Data`] if an injury column is missing or a
/// count is not a non-negative whole number, and [`SeverityError::Csv`]
/// on malformed CSV.
pub fn encode_csv<R: Read, W: Write>(
    reader: R,
    writer: W,
    drop_invalid: bool,
) -> Result<EncodeSummary, SeverityError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut count_positions = [0usize; SEVERITY_CLASS_COUNT];
    for class in SeverityClass::PRECEDENCE {
        count_positions[class.index()] = find_count_column(&headers, class)?;
    }

    let passthrough: Vec<usize> = (0..headers.len())
        .filter(|i| !count_positions.contains(i))
        .collect();

    let mut writer = csv::Writer::from_writer(writer);
    let mut out_headers: Vec<&str> = passthrough.iter().map(|&i| headers[i].as_str()).collect();
    out_headers.push(TARGET_COLUMN);
    writer.write_record(&out_headers)?;

    let mut summary = EncodeSummary::default();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        summary.rows_read += 1;

        let mut counts = InjuryCounts::default();
        for class in SeverityClass::PRECEDENCE {
            let raw = record.get(count_positions[class.index()]).unwrap_or("");
            counts.set(class, parse_count(raw, class, row + 1)?);
        }

        let label = encoder::encode(&counts);
        match SeverityClass::from_rank(label) {
            Ok(class) => summary.class_counts[class.index()] += 1,
            Err(_) => {
                summary.invalid += 1;
                if drop_invalid {
                    continue;
                }
            }
        }

        let label_text = label.to_string();
        let mut fields: Vec<&str> = passthrough
            .iter()
            .map(|&i| record.get(i).unwrap_or(""))
            .collect();
        fields.push(&label_text);
        writer.write_record(&fields)?;
        summary.rows_written += 1;
    }

    writer.flush()?;

    log::info!(
        "Encoded {} crash rows: {} written, {} with label {INVALID_LABEL}",
        summary.rows_read,
        summary.rows_written,
        summary.invalid
    );

    Ok(summary)
}

/// Resamples an encoded crash CSV so every valid label occurs equally
/// often (see [`balance::balance_classes`]).
///
/// Rows with [`INVALID_LABEL`] are dropped first. Returns the number of
/// rows written per class, ordered by rank.
///
/// # Errors
///
/// Returns [`SeverityError::Data`] if the `target` column is missing or
/// holds a value outside 0-6, and [`SeverityError::Csv`] on malformed CSV.
pub fn balance_csv<R: Read, W: Write, G: Rng + ?Sized>(
    reader: R,
    writer: W,
    rng: &mut G,
) -> Result<[u64; SEVERITY_CLASS_COUNT], SeverityError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let headers = reader.headers()?.clone();
    let target_at = headers
        .iter()
        .position(|h| h.trim() == TARGET_COLUMN)
        .ok_or_else(|| SeverityError::Data {
            message: format!("encoded table is missing '{TARGET_COLUMN}' column"),
        })?;

    let mut rows = Vec::new();
    let mut dropped = 0u64;
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let raw = record.get(target_at).unwrap_or("").trim();
        let label = raw
            .parse::<u8>()
            .ok()
            .filter(|l| usize::from(*l) <= SEVERITY_CLASS_COUNT)
            .ok_or_else(|| SeverityError::Data {
                message: format!("row {}: invalid {TARGET_COLUMN} '{raw}'", row + 1),
            })?;
        if label == INVALID_LABEL {
            dropped += 1;
        } else {
            rows.push((label, record));
        }
    }
    if dropped > 0 {
        log::warn!("Dropped {dropped} rows with label {INVALID_LABEL} before balancing");
    }

    let balanced = balance::balance_classes(&rows, |(label, _)| *label, rng);

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&headers)?;
    let mut counts = [0u64; SEVERITY_CLASS_COUNT];
    for (label, record) in &balanced {
        writer.write_record(record)?;
        counts[usize::from(*label) - 1] += 1;
    }
    writer.flush()?;

    log::info!(
        "Balanced {} labelled rows into {} rows",
        rows.len(),
        balanced.len()
    );
    Ok(counts)
}

fn find_count_column(headers: &[String], class: SeverityClass) -> Result<usize, SeverityError> {
    let primary = class.count_column();
    headers
        .iter()
        .position(|h| h == primary)
        .or_else(|| {
            (class == SeverityClass::Incapacitating)
                .then(|| headers.iter().position(|h| h == INCAPACITATING_ALIAS))
                .flatten()
        })
        .ok_or_else(|| SeverityError::Data {
            message: format!("crash table is missing injury column '{primary}'"),
        })
}

/// Parses one raw injury count. Whole-number floats (`"2.0"`) are
/// accepted since some exports write counts that way.
fn parse_count(raw: &str, class: SeverityClass, row: usize) -> Result<u32, SeverityError> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u32>() {
        return Ok(value);
    }

    match raw.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Ok(value as u32)
        }
        _ => Err(SeverityError::Data {
            message: format!(
                "row {row}: '{}' value '{raw}' is not a non-negative whole number",
                class.count_column()
            ),
        }),
    }
}
