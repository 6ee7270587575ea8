//! Core domain types: records, record sets, data sources, run statistics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MatrikkelError, Result};

/// Schema version embedded in every cache entry. Bump whenever a pipeline
/// stage changes its output so stale caches are rebuilt.
pub const CACHE_VERSION: &str = "2026-02-10-category-fallback-annet-v4";

/// Placeholder tokens that count as "no value", compared after trim + lowercase.
const MISSING_TOKENS: &[&str] = &["", "-", "nan", "<na>", "none", "null"];

// ---------------------------------------------------------------------------
// Missing-value handling
// ---------------------------------------------------------------------------

/// True when a cell carries no usable value: JSON null, a non-finite number,
/// or a string that is empty or a placeholder such as `-`, `nan` or `none`.
pub fn is_missing_token(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| !f.is_finite()),
        Value::String(s) => is_missing_str(s),
        _ => false,
    }
}

/// String form of [`is_missing_token`].
pub fn is_missing_str(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    MISSING_TOKENS.contains(&normalized.as_str())
}

/// Render a cell as text. Integral floats lose their `.0` so that
/// `1201.0` and `1201` print the same. Null renders as an empty string.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => String::new(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Numeric coercion: numbers as-is, numeric strings parsed, everything else `None`.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Integer coercion that truncates like `int(float(x))`: `"671.0"` → 671.
pub fn value_as_int(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    value_as_f64(value).map(|f| f.trunc() as i64)
}

// ---------------------------------------------------------------------------
// PropertyRecord
// ---------------------------------------------------------------------------

/// One row of the source registry, keyed by column name.
///
/// Cells are kept as JSON values so that the record survives a cache
/// round trip unchanged; typed access goes through the accessor methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRecord(pub Map<String, Value>);

impl PropertyRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Raw cell value; absent keys read as `None`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Overwrite a cell.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    /// True when the cell is absent or a missing token.
    pub fn is_missing(&self, column: &str) -> bool {
        self.get(column).is_none_or(is_missing_token)
    }

    /// Trimmed text of a present, non-placeholder cell.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column) {
            Some(v) if !is_missing_token(v) => Some(value_to_string(v).trim().to_string()),
            _ => None,
        }
    }

    /// Text of the cell as-is, empty when absent or null.
    pub fn raw_text(&self, column: &str) -> String {
        self.get(column).map(value_to_string).unwrap_or_default()
    }

    /// Integer value of the cell, truncating floats and parsing numeric strings.
    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(value_as_int)
    }

    /// Float value of the cell.
    pub fn float(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(value_as_f64)
    }
}

impl From<Map<String, Value>> for PropertyRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// RecordSet
// ---------------------------------------------------------------------------

/// An ordered list of columns plus the records that use them.
///
/// `columns` fixes the column order for output; records may omit cells,
/// which read as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<PropertyRecord>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, records: Vec<PropertyRecord>) -> Self {
        Self { columns, records }
    }

    /// Same columns, no records.
    pub fn empty_like(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Append `column` to the column list unless it is already there.
    pub fn ensure_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Keep the records matching `keep`, returning how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&PropertyRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|r| keep(r));
        before - self.records.len()
    }

    /// Split into `(matching, rest)`, both with this set's columns.
    pub fn partition(self, mut pred: impl FnMut(&PropertyRecord) -> bool) -> (Self, Self) {
        let (yes, no): (Vec<_>, Vec<_>) = self.records.into_iter().partition(|r| pred(r));
        (
            Self::new(self.columns.clone(), yes),
            Self::new(self.columns, no),
        )
    }

    /// Rows as JSON objects carrying every column (null-filled), in record order.
    pub fn to_rows(&self) -> Vec<Map<String, Value>> {
        self.records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .map(|c| (c.clone(), record.get(c).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect()
    }

    /// Rebuild from cached rows, keeping exactly `columns` in that order.
    /// When `columns` is empty the keys of the first row are used.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Map<String, Value>>) -> Self {
        let columns = if columns.is_empty() {
            rows.first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            columns
        };
        let records = rows
            .into_iter()
            .map(|mut row| {
                let reindexed: Map<String, Value> = columns
                    .iter()
                    .map(|c| (c.clone(), row.remove(c).unwrap_or(Value::Null)))
                    .collect();
                PropertyRecord(reindexed)
            })
            .collect();
        Self { columns, records }
    }
}

// ---------------------------------------------------------------------------
// DataSource
// ---------------------------------------------------------------------------

/// Which source tree a workbook came from; selects the cache root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Raw,
    Imputed,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Imputed => "imputed",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataSource {
    type Err = MatrikkelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "imputed" => Ok(Self::Imputed),
            other => Err(MatrikkelError::validation(format!(
                "unknown data source '{other}': expected 'raw' or 'imputed'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RunStatistics
// ---------------------------------------------------------------------------

/// Row counts recorded for one pipeline run, persisted with the cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStatistics {
    /// Rows left after the ownership filter, before the status split.
    pub total_rows: usize,
    /// First 8 hex chars of the source content hash.
    pub file_hash: String,
    /// Rows read from the sheet.
    pub source_rows: usize,
    /// Rows removed by the ownership filter.
    pub ownership_filtered_out_rows: usize,
    /// Filtered rows whose alternate addresses came from a cadastral sibling.
    pub address_backfilled_rows: usize,
    pub deduplicated_rows: usize,
    pub unfiltered_rows: usize,
    pub unfiltered_deduplicated_rows: usize,
    /// Unfiltered rows minus final filtered rows (ownership + status).
    pub filtered_out_rows: usize,
    pub filtered_out_status_rows: usize,
    pub excluded_status_rows: usize,
    pub excluded_status_deduplicated_rows: usize,
}
