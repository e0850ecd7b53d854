//! Loaded survey table, raw values and source metadata.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metadata about the loaded survey export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (csv, tsv, etc.).
    pub format: String,
    /// Number of participant rows (excluding header).
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded from disk.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }

    /// Metadata for a table that was built in memory rather than read from a file.
    pub fn in_memory(table: &DataTable) -> Self {
        Self {
            file: "<memory>".to_string(),
            path: PathBuf::new(),
            hash: String::new(),
            size_bytes: 0,
            format: "memory".to_string(),
            row_count: table.row_count(),
            column_count: table.column_count(),
            loaded_at: Utc::now(),
        }
    }
}

/// A single raw cell value as exported by the survey platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    /// Empty cell or a recognised missing marker.
    Missing,
    /// A numeric code or measurement.
    Number(f64),
    /// Anything that is neither missing nor numeric.
    Text(String),
}

impl RawValue {
    /// Interpret a cell string.
    pub fn parse(cell: &str) -> Self {
        if DataTable::is_null_value(cell) {
            return RawValue::Missing;
        }
        let trimmed = cell.trim();
        // Dutch exports sometimes use a decimal comma.
        let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
            trimmed.replace(',', ".")
        } else {
            trimmed.to_string()
        };
        match normalized.parse::<f64>() {
            Ok(n) if n.is_finite() => RawValue::Number(n),
            _ => RawValue::Text(trimmed.to_string()),
        }
    }

    /// The numeric value, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as an integer code, when it is an integral number.
    pub fn as_code(&self) -> Option<i64> {
        match self {
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Some(*n as i64)
            }
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Missing => Ok(()),
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

static MISSING_CELL: RawValue = RawValue::Missing;

/// One participant row, keyed by raw variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Participant identifier (`Nummer`).
    pub id: String,
    /// Raw values in column order.
    pub values: IndexMap<String, RawValue>,
}

impl RawRecord {
    /// Build a record from `(name, cell)` pairs.
    pub fn from_cells<'a>(
        id: impl Into<String>,
        cells: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            id: id.into(),
            values: cells
                .into_iter()
                .map(|(name, cell)| (name.to_string(), RawValue::parse(cell)))
                .collect(),
        }
    }

    /// Look up a raw value. Absent columns read as `None`.
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    /// Look up a raw value, reading absent columns as missing.
    pub fn value(&self, name: &str) -> &RawValue {
        self.values.get(name).unwrap_or(&MISSING_CELL)
    }
}

/// Represents parsed tabular data.
#[derive(Debug, Clone)]
pub struct DataTable {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data as strings (row-major order).
    pub rows: Vec<Vec<String>>,
    /// The delimiter used.
    pub delimiter: u8,
}

impl DataTable {
    /// Create a new data table.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: u8) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows (excluding header).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Get all values for a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Convert every row into a [`RawRecord`].
    ///
    /// The id is read from `id_column`; when that column does not exist the
    /// 1-based row number is used instead.
    pub fn records(&self, id_column: &str) -> Vec<RawRecord> {
        let id_index = self.column_index(id_column);
        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let id = id_index
                    .and_then(|i| row.get(i))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| (row_idx + 1).to_string());
                RawRecord::from_cells(
                    id,
                    self.headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (h.as_str(), v.as_str())),
                )
            })
            .collect()
    }

    /// Check if a value represents a missing/null value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nil")
            || trimmed == "."
            || trimmed == "-"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_values() {
        assert_eq!(RawValue::parse(""), RawValue::Missing);
        assert_eq!(RawValue::parse(" NA "), RawValue::Missing);
        assert_eq!(RawValue::parse("3"), RawValue::Number(3.0));
        assert_eq!(RawValue::parse("2,5"), RawValue::Number(2.5));
        assert_eq!(RawValue::parse("vrouw"), RawValue::Text("vrouw".to_string()));
    }

    #[test]
    fn test_as_code_rejects_fractions() {
        assert_eq!(RawValue::Number(4.0).as_code(), Some(4));
        assert_eq!(RawValue::Number(4.5).as_code(), None);
        assert_eq!(RawValue::Missing.as_code(), None);
    }

    #[test]
    fn test_records_fall_back_to_row_number() {
        let table = DataTable::new(
            vec!["W1_X".to_string()],
            vec![vec!["1".to_string()], vec!["".to_string()]],
            b',',
        );
        let records = table.records("Nummer");
        assert_eq!(records[0].id, "1");
        assert_eq!(records[1].id, "2");
        assert_eq!(records[1].get("W1_X"), Some(&RawValue::Missing));
    }

    #[test]
    fn test_is_null_value() {
        assert!(DataTable::is_null_value(""));
        assert!(DataTable::is_null_value("NA"));
        assert!(DataTable::is_null_value("."));
        assert!(!DataTable::is_null_value("0"));
    }
}
