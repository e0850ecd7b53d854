//! Recoverable data-quality issues collected while the pipeline runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of issue detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A declared variable is absent from the loaded table; whatever depends
    /// on it is skipped for this run.
    MissingInput,
    /// A raw value outside the codebook's declared levels, treated as missing.
    UnmappedCode,
    /// A study-design invariant does not hold (e.g. a participant in neither wave).
    InvariantViolation,
    /// A statistic that cannot be computed (no valid cases, zero variance).
    UndefinedStatistic,
}

impl IssueKind {
    /// Get a human-readable label for the issue kind.
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::MissingInput => "Missing Input",
            IssueKind::UnmappedCode => "Unmapped Code",
            IssueKind::InvariantViolation => "Invariant Violation",
            IssueKind::UndefinedStatistic => "Undefined Statistic",
        }
    }
}

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only, may not require action.
    Info,
    /// Potential issue that should be reviewed.
    Warning,
    /// Definite issue that should be addressed.
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// Most participant ids kept as evidence for one finding.
pub const MAX_SAMPLE_IDS: usize = 10;

/// Evidence supporting an issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Number of occurrences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<usize>,
    /// Offending values (e.g. unmapped codes with counts).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    /// Sample participant ids.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sample_ids: Vec<String>,
    /// Expected values or range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_occurrences(mut self, count: usize) -> Self {
        self.occurrences = Some(count);
        self
    }

    pub fn with_values(mut self, values: impl Into<Value>) -> Self {
        self.values = Some(values.into());
        self
    }

    /// Keep at most ten sample ids.
    pub fn with_sample_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.sample_ids = ids.into_iter().take(MAX_SAMPLE_IDS).collect();
        self
    }

    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }
}

/// A data-quality issue. Issues never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    /// Affected variable (or indicator pair, or scale).
    pub variable: String,
    pub description: String,
    #[serde(default)]
    pub evidence: Evidence,
    /// Pipeline stage that raised the issue.
    pub stage: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        variable: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            variable: variable.into(),
            description: description.into(),
            evidence: Evidence::new(),
            stage: String::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    /// Emit the issue to the log at a level matching its severity.
    pub(crate) fn log(&self) {
        match self.severity {
            Severity::Error | Severity::Warning => tracing::warn!(
                kind = self.kind.label(),
                variable = %self.variable,
                stage = %self.stage,
                "{}",
                self.description
            ),
            Severity::Info => tracing::debug!(
                kind = self.kind.label(),
                variable = %self.variable,
                stage = %self.stage,
                "{}",
                self.description
            ),
        }
    }
}

/// Counts of issues by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl IssueCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut counts, issue| {
            match issue.severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
            counts
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_issue() {
        let issue = Issue::new(
            IssueKind::UnmappedCode,
            Severity::Warning,
            "W1_Geslacht",
            "2 values outside the declared levels",
        )
        .with_stage("recode")
        .with_evidence(Evidence::new().with_occurrences(2).with_values(serde_json::json!({"9": 2})));

        assert_eq!(issue.kind.label(), "Unmapped Code");
        assert_eq!(issue.evidence.occurrences, Some(2));
        assert_eq!(issue.stage, "recode");
    }

    #[test]
    fn test_sample_ids_are_capped() {
        let evidence = Evidence::new().with_sample_ids((0..50).map(|i| i.to_string()));
        assert_eq!(evidence.sample_ids.len(), MAX_SAMPLE_IDS);
    }

    #[test]
    fn test_tally() {
        let issues = vec![
            Issue::new(IssueKind::MissingInput, Severity::Warning, "a", ""),
            Issue::new(IssueKind::InvariantViolation, Severity::Error, "b", ""),
            Issue::new(IssueKind::UndefinedStatistic, Severity::Info, "c", ""),
            Issue::new(IssueKind::UndefinedStatistic, Severity::Info, "d", ""),
        ];
        let counts = IssueCounts::tally(&issues);
        assert_eq!(counts, IssueCounts { error: 1, warning: 1, info: 2 });
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}
