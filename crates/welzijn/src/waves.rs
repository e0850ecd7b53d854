//! Wave participation: who took part in which wave.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Evidence, Issue, IssueKind, Severity};
use crate::input::{DataTable, RawValue};

/// Participation category derived from the `W1`/`W2` indicator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveParticipation {
    OnlyW1,
    OnlyW2,
    Both,
    /// Both indicators are 0; every participant should be in at least one wave.
    Neither,
    /// At least one indicator is missing or not exactly 0/1.
    Unknown,
}

impl WaveParticipation {
    /// Classify an indicator pair.
    pub fn classify(w1: &RawValue, w2: &RawValue) -> Self {
        match (indicator(w1), indicator(w2)) {
            (Some(true), Some(true)) => WaveParticipation::Both,
            (Some(true), Some(false)) => WaveParticipation::OnlyW1,
            (Some(false), Some(true)) => WaveParticipation::OnlyW2,
            (Some(false), Some(false)) => WaveParticipation::Neither,
            _ => WaveParticipation::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WaveParticipation::OnlyW1 => "only wave 1",
            WaveParticipation::OnlyW2 => "only wave 2",
            WaveParticipation::Both => "both waves",
            WaveParticipation::Neither => "neither wave",
            WaveParticipation::Unknown => "unknown",
        }
    }
}

/// `Some(true)` for exactly 1, `Some(false)` for exactly 0, `None` otherwise.
fn indicator(value: &RawValue) -> Option<bool> {
    match value.as_number() {
        Some(n) if n == 1.0 => Some(true),
        Some(n) if n == 0.0 => Some(false),
        _ => None,
    }
}

/// Participant counts per category. The five buckets sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveCounts {
    pub only_w1: usize,
    pub only_w2: usize,
    pub both: usize,
    pub neither: usize,
    pub unknown: usize,
    pub total: usize,
}

impl WaveCounts {
    fn add(&mut self, participation: WaveParticipation) {
        self.total += 1;
        match participation {
            WaveParticipation::OnlyW1 => self.only_w1 += 1,
            WaveParticipation::OnlyW2 => self.only_w2 += 1,
            WaveParticipation::Both => self.both += 1,
            WaveParticipation::Neither => self.neither += 1,
            WaveParticipation::Unknown => self.unknown += 1,
        }
    }

    pub fn get(&self, participation: WaveParticipation) -> usize {
        match participation {
            WaveParticipation::OnlyW1 => self.only_w1,
            WaveParticipation::OnlyW2 => self.only_w2,
            WaveParticipation::Both => self.both,
            WaveParticipation::Neither => self.neither,
            WaveParticipation::Unknown => self.unknown,
        }
    }

    /// 2x2 table of W1 x W2 over participants with definite indicators.
    pub fn crosstab(&self) -> CrossTab {
        CrossTab {
            cells: [[self.neither, self.only_w2], [self.only_w1, self.both]],
        }
    }
}

/// W1 x W2 participation table. Index 0 is "no", index 1 is "yes":
/// `cells[w1][w2]`. Participants with an unknown indicator are left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTab {
    pub cells: [[usize; 2]; 2],
}

impl CrossTab {
    pub fn get(&self, in_w1: bool, in_w2: bool) -> usize {
        self.cells[usize::from(in_w1)][usize::from(in_w2)]
    }

    /// Row margin for the W1 indicator.
    pub fn w1_total(&self, in_w1: bool) -> usize {
        self.cells[usize::from(in_w1)].iter().sum()
    }

    /// Column margin for the W2 indicator.
    pub fn w2_total(&self, in_w2: bool) -> usize {
        self.cells.iter().map(|row| row[usize::from(in_w2)]).sum()
    }

    pub fn total(&self) -> usize {
        self.cells.iter().flatten().sum()
    }
}

/// Result of partitioning participants by wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WavePartition {
    /// `(participant id, category)` in row order.
    pub membership: Vec<(String, WaveParticipation)>,
    pub counts: WaveCounts,
    pub issues: Vec<Issue>,
}

impl WavePartition {
    /// Row indices of participants in both waves.
    pub fn both_cohort(&self) -> Vec<usize> {
        self.rows_in(WaveParticipation::Both)
    }

    pub fn rows_in(&self, participation: WaveParticipation) -> Vec<usize> {
        self.membership
            .iter()
            .enumerate()
            .filter(|(_, (_, p))| *p == participation)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn ids_in(&self, participation: WaveParticipation) -> Vec<String> {
        self.membership
            .iter()
            .filter(|(_, p)| *p == participation)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Partitions participants using a pair of indicator columns.
#[derive(Debug, Clone)]
pub struct WaveMatcher {
    w1_column: String,
    w2_column: String,
}

impl WaveMatcher {
    pub fn new(w1_column: impl Into<String>, w2_column: impl Into<String>) -> Self {
        Self {
            w1_column: w1_column.into(),
            w2_column: w2_column.into(),
        }
    }

    /// Partition all rows of `table`.
    pub fn partition(&self, table: &DataTable, id_column: &str) -> WavePartition {
        let mut issues = Vec::new();
        for column in [&self.w1_column, &self.w2_column] {
            if !table.has_column(column) {
                issues.push(
                    Issue::new(
                        IssueKind::MissingInput,
                        Severity::Warning,
                        column.clone(),
                        format!(
                            "Wave indicator '{}' is absent; participation is unknown for everyone",
                            column
                        ),
                    )
                    .with_stage("waves"),
                );
            }
        }

        let mut counts = WaveCounts::default();
        let membership: Vec<(String, WaveParticipation)> = table
            .records(id_column)
            .into_iter()
            .map(|record| {
                let participation = WaveParticipation::classify(
                    record.value(&self.w1_column),
                    record.value(&self.w2_column),
                );
                counts.add(participation);
                (record.id, participation)
            })
            .collect();

        let mut partition = WavePartition {
            membership,
            counts,
            issues,
        };

        let (duplicated, extra_rows) = duplicate_ids(&partition.membership);
        if !duplicated.is_empty() {
            partition.issues.push(
                Issue::new(
                    IssueKind::InvariantViolation,
                    Severity::Error,
                    id_column,
                    format!(
                        "{} participant id(s) occur on more than one row ({} extra row(s)); each row is counted as a separate participant",
                        duplicated.len(),
                        extra_rows
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(extra_rows)
                        .with_sample_ids(duplicated),
                )
                .with_stage("waves"),
            );
        }

        let pair = format!("{}/{}", self.w1_column, self.w2_column);
        if counts.neither > 0 {
            let ids = partition.ids_in(WaveParticipation::Neither);
            partition.issues.push(
                Issue::new(
                    IssueKind::InvariantViolation,
                    Severity::Error,
                    pair.clone(),
                    format!(
                        "{} participant(s) are marked as taking part in neither wave",
                        counts.neither
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(counts.neither)
                        .with_sample_ids(ids),
                )
                .with_stage("waves"),
            );
        }
        if counts.unknown > 0 {
            let ids = partition.ids_in(WaveParticipation::Unknown);
            partition.issues.push(
                Issue::new(
                    IssueKind::InvariantViolation,
                    Severity::Error,
                    pair,
                    format!(
                        "{} participant(s) have a missing or non-binary wave indicator",
                        counts.unknown
                    ),
                )
                .with_evidence(
                    Evidence::new()
                        .with_occurrences(counts.unknown)
                        .with_sample_ids(ids)
                        .with_expected(serde_json::json!([0, 1])),
                )
                .with_stage("waves"),
            );
        }

        tracing::info!(
            only_w1 = counts.only_w1,
            only_w2 = counts.only_w2,
            both = counts.both,
            neither = counts.neither,
            unknown = counts.unknown,
            "Partitioned participants by wave"
        );

        partition
    }
}

/// Ids seen on more than one row, in first-seen order, and the number of
/// rows beyond the first for those ids.
fn duplicate_ids(membership: &[(String, WaveParticipation)]) -> (Vec<String>, usize) {
    let mut seen: IndexMap<&str, usize> = IndexMap::new();
    for (id, _) in membership {
        *seen.entry(id.as_str()).or_insert(0) += 1;
    }
    let mut extra_rows = 0;
    let duplicated = seen
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(id, n)| {
            extra_rows += n - 1;
            id.to_string()
        })
        .collect();
    (duplicated, extra_rows)
}

impl Default for WaveMatcher {
    fn default() -> Self {
        Self::new("W1", "W2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(w1: &[&str], w2: &[&str]) -> DataTable {
        DataTable::new(
            vec!["Nummer".to_string(), "W1".to_string(), "W2".to_string()],
            w1.iter()
                .zip(w2)
                .enumerate()
                .map(|(i, (a, b))| vec![format!("{}", 100 + i), a.to_string(), b.to_string()])
                .collect(),
            b',',
        )
    }

    #[test]
    fn test_four_categories() {
        let partition = WaveMatcher::default().partition(&table(&["1", "1", "0", "0"], &["1", "0", "1", "0"]), "Nummer");
        let c = partition.counts;
        assert_eq!((c.only_w1, c.only_w2, c.both, c.neither, c.unknown), (1, 1, 1, 1, 0));
        assert_eq!(partition.both_cohort(), vec![0]);
        assert_eq!(partition.ids_in(WaveParticipation::Neither), vec!["103"]);

        let violations: Vec<_> = partition
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::InvariantViolation)
            .collect();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].evidence.occurrences, Some(1));
    }

    #[test]
    fn test_non_binary_values_are_unknown() {
        let partition =
            WaveMatcher::default().partition(&table(&["1", "2", "", "1", "ja"], &["0.5", "1", "1", "1", "1"]), "Nummer");
        let c = partition.counts;
        assert_eq!(c.unknown, 4);
        assert_eq!(c.both, 1);
        assert_eq!(c.total, 5);
        assert!(partition.issues.iter().any(|i| i.description.contains("non-binary")));
    }

    #[test]
    fn test_counts_sum_to_total() {
        let partition = WaveMatcher::default().partition(
            &table(&["1", "0", "1", "x", "0", "1"], &["1", "1", "0", "1", "0", ""]),
            "Nummer",
        );
        let c = partition.counts;
        assert_eq!(c.only_w1 + c.only_w2 + c.both + c.neither + c.unknown, c.total);
        assert_eq!(c.total, 6);
    }

    #[test]
    fn test_crosstab_layout() {
        let counts = WaveCounts {
            only_w1: 3,
            only_w2: 2,
            both: 10,
            neither: 1,
            unknown: 4,
            total: 20,
        };
        let tab = counts.crosstab();
        assert_eq!(tab.cells, [[1, 2], [3, 10]]);
        assert_eq!(tab.get(true, false), 3);
        assert_eq!(tab.w1_total(true), 13);
        assert_eq!(tab.w2_total(true), 12);
        assert_eq!(tab.total(), counts.total - counts.unknown);
    }

    #[test]
    fn test_missing_indicator_column() {
        let table = DataTable::new(
            vec!["Nummer".to_string(), "W1".to_string()],
            vec![vec!["1".to_string(), "1".to_string()]],
            b',',
        );
        let partition = WaveMatcher::default().partition(&table, "Nummer");
        assert_eq!(partition.counts.unknown, 1);
        assert!(partition
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::MissingInput && i.variable == "W2"));
    }

    #[test]
    fn test_duplicate_ids_are_reported() {
        let table = DataTable::new(
            vec!["Nummer".to_string(), "W1".to_string(), "W2".to_string()],
            [["7", "1", "1"], ["8", "1", "0"], ["7", "1", "1"], ["9", "0", "1"], ["7", "0", "1"], ["8", "1", "0"]]
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            b',',
        );
        let partition = WaveMatcher::default().partition(&table, "Nummer");

        let duplicates: Vec<_> = partition
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::InvariantViolation && i.variable == "Nummer")
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].severity, Severity::Error);
        assert_eq!(duplicates[0].evidence.sample_ids, vec!["7", "8"]);
        assert_eq!(duplicates[0].evidence.occurrences, Some(3));
    }

    #[test]
    fn test_unique_ids_raise_no_duplicate_issue() {
        let partition = WaveMatcher::default().partition(&table(&["1", "1"], &["1", "0"]), "Nummer");
        assert!(partition.issues.iter().all(|i| i.variable != "Nummer"));
    }
}
