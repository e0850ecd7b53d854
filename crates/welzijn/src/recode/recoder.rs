//! Applies codebook entries to raw records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codebook::{Codebook, CodebookEntry, VariableKind};
use crate::diagnostics::{Evidence, Issue, IssueKind, MAX_SAMPLE_IDS, Severity};
use crate::input::{DataTable, RawRecord, RawValue};

use super::value::{ColumnOrigin, MissingReason, TypedColumn, TypedRecord, TypedTable, TypedValue};

/// Per-variable recoding counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDiagnostics {
    pub raw_name: String,
    pub derived_name: String,
    pub kind: VariableKind,
    /// Values recoded successfully.
    pub recoded: usize,
    /// Cells that were empty or a missing marker.
    pub declared_missing: usize,
    /// Cells holding a value outside the declared levels or range.
    pub unmapped: usize,
    /// Unmapped raw values with their counts.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub unmapped_values: IndexMap<String, usize>,
    /// The first participants holding an unmapped value, at most
    /// [`MAX_SAMPLE_IDS`]; `unmapped` has the full count.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped_ids: Vec<String>,
}

impl VariableDiagnostics {
    fn new(entry: &CodebookEntry) -> Self {
        Self {
            raw_name: entry.raw_name.clone(),
            derived_name: entry.derived_name.clone(),
            kind: entry.kind,
            recoded: 0,
            declared_missing: 0,
            unmapped: 0,
            unmapped_values: IndexMap::new(),
            unmapped_ids: Vec::new(),
        }
    }

    fn record(&mut self, id: &str, raw: &RawValue, value: &TypedValue) {
        match value {
            TypedValue::Missing(MissingReason::Absent) => self.declared_missing += 1,
            TypedValue::Missing(_) => {
                self.unmapped += 1;
                *self.unmapped_values.entry(raw.to_string()).or_insert(0) += 1;
                if self.unmapped_ids.len() < MAX_SAMPLE_IDS {
                    self.unmapped_ids.push(id.to_string());
                }
            }
            _ => self.recoded += 1,
        }
    }
}

/// Counters for a whole recoding run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecodeDiagnostics {
    /// Raw name -> counters, for every entry whose column was present.
    pub variables: IndexMap<String, VariableDiagnostics>,
    /// Raw names declared in the codebook but absent from the table.
    pub missing_inputs: Vec<String>,
}

impl RecodeDiagnostics {
    pub fn total_unmapped(&self) -> usize {
        self.variables.values().map(|v| v.unmapped).sum()
    }

    pub fn total_declared_missing(&self) -> usize {
        self.variables.values().map(|v| v.declared_missing).sum()
    }

    /// Issues for absent inputs and unmapped codes.
    pub fn issues(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .missing_inputs
            .iter()
            .map(|raw| {
                Issue::new(
                    IssueKind::MissingInput,
                    Severity::Warning,
                    raw.clone(),
                    format!("Variable '{}' is declared in the codebook but absent from the data; skipped", raw),
                )
                .with_stage("recode")
            })
            .collect();

        for var in self.variables.values().filter(|v| v.unmapped > 0) {
            let values: serde_json::Map<String, serde_json::Value> = var
                .unmapped_values
                .iter()
                .map(|(value, count)| (value.clone(), (*count).into()))
                .collect();
            issues.push(
                Issue::new(
                    IssueKind::UnmappedCode,
                    Severity::Warning,
                    var.raw_name.clone(),
                    format!(
                        "{} value(s) in '{}' outside the declared codebook range, treated as missing",
                        var.unmapped, var.raw_name
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(var.unmapped)
                        .with_values(values)
                        .with_sample_ids(var.unmapped_ids.iter().cloned()),
                )
                .with_stage("recode"),
            );
        }

        issues
    }
}

/// Recodes raw records with a borrowed, read-only codebook.
pub struct Recoder<'a> {
    codebook: &'a Codebook,
}

impl<'a> Recoder<'a> {
    pub fn new(codebook: &'a Codebook) -> Self {
        Self { codebook }
    }

    /// Recode one raw value according to one entry.
    pub fn recode_value(entry: &CodebookEntry, raw: &RawValue) -> TypedValue {
        if raw.is_missing() {
            return TypedValue::Missing(MissingReason::Absent);
        }

        match entry.kind {
            VariableKind::Ratio => raw
                .as_number()
                .and_then(|n| entry.ratio.as_ref().and_then(|rule| rule.apply(n)))
                .map(TypedValue::Number)
                .unwrap_or(TypedValue::Missing(MissingReason::Unmapped)),
            VariableKind::Nominal | VariableKind::Ordinal | VariableKind::LikertItem => raw
                .as_code()
                .and_then(|code| entry.label_for(code).map(|label| TypedValue::label(code, label)))
                .unwrap_or(TypedValue::Missing(MissingReason::Unmapped)),
        }
    }

    /// Recode one participant. Entries whose raw column is not in the record
    /// are skipped.
    pub fn recode_record(&self, record: &RawRecord) -> TypedRecord {
        let mut typed = TypedRecord::new(record.id.clone());
        for entry in self.codebook.entries() {
            if let Some(raw) = record.get(&entry.raw_name) {
                typed
                    .values
                    .insert(entry.derived_name.clone(), Self::recode_value(entry, raw));
            }
        }
        typed
    }

    /// Recode every row of a table, collecting diagnostics.
    pub fn recode_table(&self, table: &DataTable, id_column: &str) -> TypedTable {
        let raw_records = table.records(id_column);
        let mut diagnostics = RecodeDiagnostics::default();
        let mut columns = Vec::new();

        let present: Vec<&CodebookEntry> = self
            .codebook
            .entries()
            .iter()
            .filter(|entry| {
                let found = table.has_column(&entry.raw_name);
                if !found {
                    diagnostics.missing_inputs.push(entry.raw_name.clone());
                }
                found
            })
            .collect();

        for entry in &present {
            columns.push(TypedColumn {
                name: entry.derived_name.clone(),
                origin: ColumnOrigin::Recoded {
                    raw_name: entry.raw_name.clone(),
                    kind: entry.kind,
                },
            });
            diagnostics
                .variables
                .insert(entry.raw_name.clone(), VariableDiagnostics::new(entry));
        }

        let records = raw_records
            .iter()
            .map(|raw_record| {
                let mut typed = TypedRecord::new(raw_record.id.clone());
                for entry in &present {
                    let raw = raw_record.value(&entry.raw_name);
                    let value = Self::recode_value(entry, raw);
                    if let Some(var) = diagnostics.variables.get_mut(&entry.raw_name) {
                        var.record(&raw_record.id, raw, &value);
                    }
                    typed.values.insert(entry.derived_name.clone(), value);
                }
                typed
            })
            .collect();

        tracing::info!(
            variables = columns.len(),
            skipped = diagnostics.missing_inputs.len(),
            unmapped = diagnostics.total_unmapped(),
            "Recoded survey variables"
        );

        TypedTable {
            records,
            columns,
            diagnostics,
        }
    }
}
