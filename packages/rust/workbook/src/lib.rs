//! Reading the `BuildingOwnership` sheet into a [`RecordSet`].
//!
//! The pipeline reads workbook bytes once (they are also hashed for the
//! cache key) and hands them to a [`SheetReader`]. [`XlsxReader`] is the
//! production implementation; tests substitute their own.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use matrikkel_shared::{MatrikkelError, PropertyRecord, RecordSet, Result};

/// Sheet holding one row per building/ownership record.
pub const SHEET_NAME: &str = "BuildingOwnership";

/// Date cells render like this, so the first 10 chars are an ISO date.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// SheetReader
// ---------------------------------------------------------------------------

/// Turns workbook bytes into records. Implementations must be deterministic:
/// identical bytes yield identical record sets.
pub trait SheetReader: Send + Sync {
    fn read_sheet(&self, bytes: &[u8]) -> Result<RecordSet>;
}

/// `.xlsx` / `.xls` / `.ods` reader backed by `calamine`.
#[derive(Debug, Clone)]
pub struct XlsxReader {
    sheet: String,
}

impl Default for XlsxReader {
    fn default() -> Self {
        Self {
            sheet: SHEET_NAME.to_string(),
        }
    }
}

impl XlsxReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SheetReader for XlsxReader {
    #[instrument(skip_all, fields(sheet = %self.sheet, bytes = bytes.len()))]
    fn read_sheet(&self, bytes: &[u8]) -> Result<RecordSet> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| MatrikkelError::Workbook(format!("cannot open workbook: {e}")))?;

        let range = workbook.worksheet_range(&self.sheet).map_err(|e| {
            MatrikkelError::Workbook(format!("cannot read sheet '{}': {e}", self.sheet))
        })?;

        let set = records_from_rows(range.rows());
        debug!(
            rows = set.len(),
            columns = set.columns.len(),
            "sheet loaded"
        );
        Ok(set)
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Build a record set from sheet rows, the first row being the header.
/// Blank headers become `Unnamed: {index}`; fully empty rows are dropped.
fn records_from_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>) -> RecordSet {
    let Some(header) = rows.next() else {
        return RecordSet::default();
    };

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell_to_value(cell) {
            Value::Null => format!("Unnamed: {i}"),
            v => matrikkel_shared::value_to_string(&v).trim().to_string(),
        })
        .collect();

    let records = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| {
            let cells: Map<String, Value> = columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = row.get(i).map(cell_to_value).unwrap_or(Value::Null);
                    (col.clone(), value)
                })
                .collect();
            PropertyRecord::from(cells)
        })
        .collect();

    RecordSet::new(columns, records)
}

/// Map one cell to JSON. Integral floats become integers, dates become
/// `YYYY-MM-DD HH:MM:SS` text, empty and error cells become null.
pub fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            Value::from(*f as i64)
        }
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Value::String(d.format(DATETIME_FORMAT).to_string()))
            .unwrap_or(Value::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}
