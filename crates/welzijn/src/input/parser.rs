//! CSV/TSV loader with delimiter detection.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::source::{DataTable, SourceMetadata};
use crate::error::{Result, WelzijnError};

/// Delimiters to try when auto-detecting. Semicolon is common in Dutch exports.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Loads survey exports into a [`DataTable`].
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();

        let contents = fs::read(path).map_err(|e| WelzijnError::io(path, e))?;
        let size_bytes = contents.len() as u64;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents)?,
        };

        let data_table = self.parse_bytes(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        tracing::info!(
            file = %path.display(),
            rows = data_table.row_count(),
            columns = data_table.column_count(),
            format = %format,
            "Loaded survey export"
        );

        let source_metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            data_table.row_count(),
            data_table.column_count(),
        );

        Ok((data_table, source_metadata))
    }

    /// Parse an in-memory export, auto-detecting the delimiter unless configured.
    pub fn parse_str(&self, contents: &str) -> Result<DataTable> {
        let bytes = contents.as_bytes();
        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(bytes)?,
        };
        self.parse_bytes(bytes, delimiter)
    }

    /// Parse bytes directly.
    fn parse_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(WelzijnError::EmptyData("No columns found".to_string()));
        }

        let mut rows = Vec::new();
        let expected_cols = headers.len();

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();

            if row.len() != expected_cols {
                tracing::debug!(
                    row = row_idx + 1,
                    found = row.len(),
                    expected = expected_cols,
                    "Ragged row padded to header width"
                );
            }
            row.resize(expected_cols, String::new());

            rows.push(row);
        }

        if rows.is_empty() {
            return Err(WelzijnError::EmptyData("No data rows found".to_string()));
        }

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the delimiter from the header and the first data rows.
///
/// A candidate must occur in the header. Candidates score by how many data
/// rows split into as many fields as the header, then by header width. Dutch
/// exports pair `;` fields with decimal commas (`2,5`): the comma is no
/// candidate when every data row has the header's semicolon count and all of
/// its unquoted commas sit between digits.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some((header, data)) = lines.split_first() else {
        return Err(WelzijnError::EmptyData("No lines to analyze".to_string()));
    };

    let header_semicolons = count_delimiter_in_line(header, b';');
    let decimal_commas = header_semicolons > 0
        && data.iter().all(|line| {
            count_delimiter_in_line(line, b';') == header_semicolons && only_decimal_commas(line)
        });

    let mut best: Option<(u8, (usize, usize))> = None;
    for &delim in DELIMITERS {
        if delim == b',' && decimal_commas {
            continue;
        }
        let separators = count_delimiter_in_line(header, delim);
        if separators == 0 {
            continue;
        }
        let matching = data
            .iter()
            .filter(|line| count_delimiter_in_line(line, delim) == separators)
            .count();
        let score = (matching, separators);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((delim, score));
        }
    }

    Ok(best.map_or(b',', |(delim, _)| delim))
}

/// Whether every unquoted comma in `line` sits between two digits.
fn only_decimal_commas(line: &str) -> bool {
    let chars: Vec<char> = line.chars().collect();
    let mut in_quotes = false;
    for (i, &ch) in chars.iter().enumerate() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let before = i > 0 && chars[i - 1].is_ascii_digit();
                let after = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
                if !(before && after) {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
