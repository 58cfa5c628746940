//! Observation table loading.
//!
//! Reads the raw trace table (`taxi_id,time,longitude,latitude`) from any
//! [`Read`] source into an in-memory row vector. Columns are resolved by
//! header name, case-insensitively, so column order in the source file does
//! not matter.
//!
//! Loading is all-or-nothing: a malformed row, a missing field, an
//! unparseable timestamp, or an out-of-range coordinate aborts the load.
//! There is no partial-success mode.

use std::io::Read;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::info;

use crate::{error::ReportError, Observation};

/// Timestamp layout used by the trace table, e.g. `2008-02-03 10:00:00`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolved header positions of the four required columns.
#[derive(Debug)]
struct ColumnIndex {
    taxi_id: usize,
    time: usize,
    longitude: usize,
    latitude: usize,
}

fn resolve_columns(header: &StringRecord) -> Result<ColumnIndex, ReportError> {
    let position = |name: &str| -> Result<usize, ReportError> {
        header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| ReportError::Load {
                row: 0,
                reason: format!("required column {name:?} not found in header"),
            })
    };

    Ok(ColumnIndex {
        taxi_id: position("taxi_id")?,
        time: position("time")?,
        longitude: position("longitude")?,
        latitude: position("latitude")?,
    })
}

fn parse_row(cols: &ColumnIndex, record: &StringRecord, row: usize) -> Result<Observation, ReportError> {
    let field = |idx: usize, name: &str| -> Result<&str, ReportError> {
        record.get(idx).ok_or_else(|| ReportError::Load {
            row,
            reason: format!("missing {name} field"),
        })
    };

    let vehicle_id = field(cols.taxi_id, "taxi_id")?.to_string();

    let raw_time = field(cols.time, "time")?;
    let timestamp =
        NaiveDateTime::parse_from_str(raw_time, TIME_FORMAT).map_err(|_| ReportError::Timestamp {
            row,
            value: raw_time.to_string(),
        })?;

    let longitude: f64 = field(cols.longitude, "longitude")?
        .parse()
        .map_err(|e| ReportError::Load {
            row,
            reason: format!("invalid longitude: {e}"),
        })?;
    let latitude: f64 = field(cols.latitude, "latitude")?
        .parse()
        .map_err(|e| ReportError::Load {
            row,
            reason: format!("invalid latitude: {e}"),
        })?;

    let obs = Observation {
        vehicle_id,
        timestamp,
        longitude,
        latitude,
    };

    if !obs.position().is_valid() {
        return Err(ReportError::Load {
            row,
            reason: format!("coordinate ({longitude}, {latitude}) out of range"),
        });
    }

    Ok(obs)
}

/// Load the full observation table from a CSV source.
///
/// # Errors
///
/// Any unreadable or malformed row is fatal ([`ReportError::Load`],
/// [`ReportError::Timestamp`], or [`ReportError::Table`]); no rows are
/// returned from a partially valid table. An empty table (header only) loads
/// successfully as zero rows.
pub fn load_observations<R: Read>(source: R) -> Result<Vec<Observation>, ReportError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let header = rdr.headers()?.clone();
    let cols = resolve_columns(&header)?;

    let mut observations = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        // Row numbers are 1-based data rows; the header is row 0.
        let row = i + 1;
        let record = record?;
        observations.push(parse_row(&cols, &record, row)?);
    }

    info!("loaded {} observations", observations.len());
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
taxi_id,time,longitude,latitude
T1,2008-02-03 10:00:00,116.0,39.9
T2,2008-02-03 10:00:05,116.4,39.95
";

    #[test]
    fn test_load_basic_table() {
        let rows = load_observations(TABLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vehicle_id, "T1");
        assert_eq!(rows[1].longitude, 116.4);
        assert_eq!(
            rows[0].timestamp,
            NaiveDateTime::parse_from_str("2008-02-03 10:00:00", TIME_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_load_reordered_columns() {
        let table = "\
time,latitude,longitude,taxi_id
2008-02-03 10:00:00,39.9,116.0,T1
";
        let rows = load_observations(table.as_bytes()).unwrap();
        assert_eq!(rows[0].vehicle_id, "T1");
        assert_eq!(rows[0].longitude, 116.0);
        assert_eq!(rows[0].latitude, 39.9);
    }

    #[test]
    fn test_load_missing_column_is_fatal() {
        let table = "taxi_id,time,longitude\nT1,2008-02-03 10:00:00,116.0\n";
        let err = load_observations(table.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Load { row: 0, .. }));
    }

    #[test]
    fn test_load_bad_timestamp_is_fatal() {
        let table = "\
taxi_id,time,longitude,latitude
T1,2008/02/03 10:00,116.0,39.9
";
        let err = load_observations(table.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Timestamp { row: 1, .. }));
    }

    #[test]
    fn test_load_out_of_range_coordinate_is_fatal() {
        let table = "\
taxi_id,time,longitude,latitude
T1,2008-02-03 10:00:00,200.0,39.9
";
        let err = load_observations(table.as_bytes()).unwrap_err();
        assert!(matches!(err, ReportError::Load { row: 1, .. }));
    }

    #[test]
    fn test_load_empty_table() {
        let table = "taxi_id,time,longitude,latitude\n";
        let rows = load_observations(table.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }
}
