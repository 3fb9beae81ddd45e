//! Seasonality priors from published traffic statistics.
//!
//! Two tables feed the sampler: a monthly traffic table (one column per
//! month, summed over its rows to get the month weights) and a
//! weekday × hour intensity table (one row per hour, one column per
//! weekday). Both are read-only once loaded.

use std::io::Read;

use crash_risk_road_models::Weekday;

use crate::SamplerError;

/// Years the control records are spread over when no pool is given.
pub const DEFAULT_YEARS: [i32; 3] = [2018, 2019, 2020];

/// Monthly traffic weights, January first. Not necessarily normalized.
pub type MonthlyWeights = [f64; 12];

/// One cell of the weekday × hour intensity table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekdayHourCell {
    /// Day of week.
    pub weekday: Weekday,
    /// Hour of day (0-23).
    pub hour: u32,
    /// Share of weekly traffic in this hour.
    pub weight: f64,
}

/// Joint weekday × hour traffic intensity, flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekdayHourTable {
    cells: Vec<WeekdayHourCell>,
}

impl WeekdayHourTable {
    /// Builds a table from explicit cells.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::Data`] if an hour is outside 0-23.
    pub fn from_cells(cells: Vec<WeekdayHourCell>) -> Result<Self, SamplerError> {
        if let Some(bad) = cells.iter().find(|c| c.hour > 23) {
            return Err(SamplerError::data(format!(
                "weekday/hour table has hour {} for {}",
                bad.hour, bad.weekday
            )));
        }
        Ok(Self { cells })
    }

    /// Flattened cells in (weekday column, hour row) order.
    #[must_use]
    pub fn cells(&self) -> &[WeekdayHourCell] {
        &self.cells
    }

    /// Sum of all cell weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.cells.iter().map(|c| c.weight).sum()
    }
}

/// All read-only priors the control sampler is constructed with.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalityPriors {
    /// Monthly traffic seasonality.
    pub monthly: MonthlyWeights,
    /// Weekday × hour traffic intensity.
    pub weekday_hour: WeekdayHourTable,
    /// Candidate years, drawn uniformly.
    pub years: Vec<i32>,
}

/// Loads monthly weights from a published monthly traffic table.
///
/// The first column is a row label; the next twelve are January through
/// December. Each month's weight is the sum of its column.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if the table has fewer than thirteen
/// columns or a value is not a finite number.
pub fn load_monthly<R: Read>(reader: R) -> Result<MonthlyWeights, SamplerError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let width = reader.headers()?.len();
    if width < 13 {
        return Err(SamplerError::data(format!(
            "monthly traffic table has {width} columns, expected a label column and 12 months"
        )));
    }

    let mut weights = [0.0; 12];
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        for (month, weight) in weights.iter_mut().enumerate() {
            *weight += parse_weight(record.get(month + 1).unwrap_or(""), row + 1)?;
        }
    }

    log::debug!("Loaded monthly seasonality: {weights:?}");
    Ok(weights)
}

/// Loads the weekday × hour intensity table.
///
/// The first column is the hour label; each remaining column header names
/// a weekday. Row `i` is hour `i`. Weights are normalized by the table
/// total so the flattened distribution sums to 1.
///
/// # Errors
///
/// Returns [`SamplerError::Data`] if a header is not a weekday, there are
/// more than 24 rows, a value is not a finite number, or the table total
/// is zero.
pub fn load_weekday_hour<R: Read>(reader: R) -> Result<WeekdayHourTable, SamplerError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let weekdays: Vec<Weekday> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|h| {
            h.trim()
                .parse::<Weekday>()
                .map_err(|_| SamplerError::data(format!("'{h}' is not a weekday column")))
        })
        .collect::<Result<_, _>>()?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let values = (0..weekdays.len())
            .map(|col| parse_weight(record.get(col + 1).unwrap_or(""), row + 1))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(values);
    }

    if rows.len() > 24 {
        return Err(SamplerError::data(format!(
            "weekday/hour table has {} hour rows, expected at most 24",
            rows.len()
        )));
    }

    let total: f64 = rows.iter().flatten().sum();
    if total <= 0.0 {
        return Err(SamplerError::data("weekday/hour table sums to zero"));
    }

    let mut cells = Vec::with_capacity(weekdays.len() * rows.len());
    for (col, weekday) in weekdays.iter().enumerate() {
        for (hour, values) in (0u32..).zip(&rows) {
            cells.push(WeekdayHourCell {
                weekday: *weekday,
                hour,
                weight: values[col] / total,
            });
        }
    }

    WeekdayHourTable::from_cells(cells)
}

fn parse_weight(raw: &str, row: usize) -> Result<f64, SamplerError> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SamplerError::data(format!(
            "row {row}: '{raw}' is not a finite number"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_columns_are_summed() {
        let csv = "\
dex,JAN,FEB,MAR,APR,MAY,JUN,JUL,AUG,SEP,OCT,NOV,DEC
a,1,2,3,4,5,6,7,8,9,10,11,12
b,1,1,1,1,1,1,1,1,1,1,1,1
";
        let weights = load_monthly(csv.as_bytes()).unwrap();
        assert!((weights[0] - 2.0).abs() < 1e-12);
        assert!((weights[11] - 13.0).abs() < 1e-12);
    }

    #[test]
    fn monthly_table_needs_twelve_months() {
        let csv = "dex,JAN,FEB\na,1,2\n";
        assert!(matches!(
            load_monthly(csv.as_bytes()),
            Err(SamplerError::Data { .. })
        ));
    }

    #[test]
    fn weekday_hour_table_is_normalized_and_flattened() {
        let csv = "\
hour,Monday,Sunday
0,1,3
1,2,2
";
        let table = load_weekday_hour(csv.as_bytes()).unwrap();
        assert_eq!(table.cells().len(), 4);
        assert!((table.total() - 1.0).abs() < 1e-12);

        let first = table.cells()[0];
        assert_eq!(first.weekday, Weekday::Monday);
        assert_eq!(first.hour, 0);
        assert!((first.weight - 0.125).abs() < 1e-12);

        let last = table.cells()[3];
        assert_eq!(last.weekday, Weekday::Sunday);
        assert_eq!(last.hour, 1);
        assert!((last.weight - 0.25).abs() < 1e-12);
    }

    #[test]
    fn unknown_weekday_header_is_rejected() {
        let csv = "hour,Moonday\n0,1\n";
        assert!(load_weekday_hour(csv.as_bytes()).is_err());
    }

    #[test]
    fn zero_table_is_rejected() {
        let csv = "hour,Monday\n0,0\n1,0\n";
        assert!(matches!(
            load_weekday_hour(csv.as_bytes()),
            Err(SamplerError::Data { .. })
        ));
    }

    #[test]
    fn out_of_range_hour_cell_is_rejected() {
        let cells = vec![WeekdayHourCell {
            weekday: Weekday::Friday,
            hour: 24,
            weight: 1.0,
        }];
        assert!(WeekdayHourTable::from_cells(cells).is_err());
    }
}
