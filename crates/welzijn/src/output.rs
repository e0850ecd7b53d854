//! Sinks: the recoded dataset and the report files.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{Result, WelzijnError};
use crate::input::DataTable;
use crate::recode::TypedTable;
use crate::report::{SummaryReport, render_text};

/// `{stem}_recoded_{YYYY-MM-DD}.csv` for a given source file.
pub fn recoded_file_name(source: &Path, date: NaiveDate) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "data".to_string());
    format!("{}_recoded_{}.csv", stem, date.format("%Y-%m-%d"))
}

/// Header and rows of the recoded dataset.
///
/// Every raw column is kept. A recoded column whose name equals its raw
/// column replaces that column's values; other derived and composite columns
/// are appended. Row order and identity follow the raw table.
pub fn recoded_rows(raw: &DataTable, typed: &TypedTable) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = raw.headers.clone();
    // (output position, typed column name)
    let mut placement: Vec<(usize, &str)> = Vec::new();

    for column in &typed.columns {
        let replaced = column
            .raw_name()
            .filter(|raw_name| *raw_name == column.name)
            .and_then(|raw_name| raw.column_index(raw_name));
        match replaced {
            Some(index) => placement.push((index, &column.name)),
            None => {
                placement.push((headers.len(), &column.name));
                headers.push(column.name.clone());
            }
        }
    }

    let rows = raw
        .rows
        .iter()
        .enumerate()
        .map(|(i, raw_row)| {
            let mut row = raw_row.clone();
            row.resize(headers.len(), String::new());
            if let Some(record) = typed.records.get(i) {
                for &(position, name) in &placement {
                    row[position] = record
                        .get(name)
                        .map(|v| v.display_value())
                        .unwrap_or_default();
                }
            }
            row
        })
        .collect();

    (headers, rows)
}

/// Write the recoded dataset as CSV.
pub fn write_recoded_csv(path: impl AsRef<Path>, raw: &DataTable, typed: &TypedTable) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let (headers, rows) = recoded_rows(raw, typed);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .from_path(path)?;
    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|e| WelzijnError::io(path, e))?;

    tracing::info!(path = %path.display(), rows = rows.len(), columns = headers.len(), "Wrote recoded dataset");
    Ok(())
}

/// Write the recoded dataset into `dir` under its date-stamped name.
pub fn write_recoded(
    dir: impl AsRef<Path>,
    source: &Path,
    date: NaiveDate,
    raw: &DataTable,
    typed: &TypedTable,
) -> Result<PathBuf> {
    let path = dir.as_ref().join(recoded_file_name(source, date));
    write_recoded_csv(&path, raw, typed)?;
    Ok(path)
}

/// Write the report as pretty-printed JSON.
pub fn write_report_json(path: impl AsRef<Path>, report: &SummaryReport) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| WelzijnError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

/// Write the human-readable report.
pub fn write_report_text(path: impl AsRef<Path>, report: &SummaryReport) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, render_text(report)).map_err(|e| WelzijnError::io(path, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WelzijnError::io(parent, e))?;
        }
    }
    Ok(())
}
