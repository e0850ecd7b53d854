//! Cross-wave consistency of same-concept variables in the both-wave cohort.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codebook::{Codebook, VariableName};
use crate::diagnostics::{Evidence, Issue, IssueKind, Severity};
use crate::input::{DataTable, RawValue};
use crate::recode::{ColumnOrigin, Recoder, TypedTable, TypedValue};
use crate::stats::{PairedStats, distinct_count, round_to};
use crate::waves::WavePartition;

/// Whether a compared variable holds category codes or measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Categorical,
    Numeric,
}

/// Stability bucket of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    /// Identical for every valid case; confirms measurement stability.
    Stable,
    Moderate,
    /// Below the instability threshold; true change or a coding problem.
    Unstable,
    /// No valid cases, so no percentage.
    NotComputable,
}

impl Stability {
    pub fn label(&self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Moderate => "moderate",
            Stability::Unstable => "unstable",
            Stability::NotComputable => "not computable",
        }
    }
}

/// Percent-identical cut-offs for the stability buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityThresholds {
    /// At or above this percentage a variable is stable.
    pub stable: f64,
    /// Below this percentage a variable is unstable.
    pub unstable_below: f64,
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self {
            stable: 100.0,
            unstable_below: 50.0,
        }
    }
}

impl StabilityThresholds {
    /// Bucket for `identical_count` out of `valid_case_count`.
    ///
    /// Decided on the exact ratio, never on the rounded percentage: 2499 of
    /// 2500 displays as 100.0 but is not stable.
    pub fn classify(&self, identical_count: usize, valid_case_count: usize) -> Stability {
        if valid_case_count == 0 {
            return Stability::NotComputable;
        }
        let percent = identical_count as f64 / valid_case_count as f64 * 100.0;
        if identical_count == valid_case_count || (self.stable < 100.0 && percent >= self.stable) {
            Stability::Stable
        } else if percent < self.unstable_below {
            Stability::Unstable
        } else {
            Stability::Moderate
        }
    }
}

/// Agreement statistics for one variable measured in both waves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableComparison {
    /// Concept name without wave prefix.
    pub variable_name: String,
    pub var_w1: String,
    pub var_w2: String,
    /// Both-wave participants with a value in both waves.
    pub valid_case_count: usize,
    pub identical_count: usize,
    /// 1 decimal; `None` when there are no valid cases.
    pub percent_identical: Option<f64>,
    /// Pearson r, 3 decimals; `None` when either side is constant.
    pub correlation: Option<f64>,
    /// 2 decimals.
    pub mean_w1: Option<f64>,
    /// 2 decimals.
    pub mean_w2: Option<f64>,
    pub value_kind: ValueKind,
    pub stability: Stability,
}

impl VariableComparison {
    /// Compare two aligned value columns over the cohort rows.
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        variable_name: impl Into<String>,
        var_w1: impl Into<String>,
        var_w2: impl Into<String>,
        w1: &[Option<f64>],
        w2: &[Option<f64>],
        cohort: &[usize],
        value_kind: ValueKind,
        thresholds: &StabilityThresholds,
    ) -> Self {
        let pairs: Vec<(f64, f64)> = cohort
            .iter()
            .filter_map(|&row| match (w1.get(row).copied()?, w2.get(row).copied()?) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            })
            .collect();

        let valid_case_count = pairs.len();
        let identical_count = pairs.iter().filter(|(a, b)| a == b).count();

        let mut acc = PairedStats::new();
        for &(a, b) in &pairs {
            acc.add(a, b);
        }

        let percent_identical = (valid_case_count > 0)
            .then(|| round_to(identical_count as f64 / valid_case_count as f64 * 100.0, 1));

        let varies = |side: fn(&(f64, f64)) -> f64| distinct_count(pairs.iter().map(side)) >= 2;
        let correlation = if varies(|p| p.0) && varies(|p| p.1) {
            acc.pearson().map(|r| round_to(r, 3))
        } else {
            None
        };

        Self {
            variable_name: variable_name.into(),
            var_w1: var_w1.into(),
            var_w2: var_w2.into(),
            valid_case_count,
            identical_count,
            percent_identical,
            correlation,
            mean_w1: acc.mean_x().map(|m| round_to(m, 2)),
            mean_w2: acc.mean_y().map(|m| round_to(m, 2)),
            value_kind,
            stability: thresholds.classify(identical_count, valid_case_count),
        }
    }

    /// Issues for statistics that could not be computed.
    pub fn issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        if self.valid_case_count == 0 {
            issues.push(
                Issue::new(
                    IssueKind::UndefinedStatistic,
                    Severity::Info,
                    self.variable_name.clone(),
                    format!(
                        "No both-wave participant has a value for '{}' in both waves; agreement not computable",
                        self.variable_name
                    ),
                )
                .with_stage("consistency"),
            );
        } else if self.correlation.is_none() {
            issues.push(
                Issue::new(
                    IssueKind::UndefinedStatistic,
                    Severity::Info,
                    self.variable_name.clone(),
                    format!(
                        "Correlation for '{}' undefined: fewer than two distinct values in a wave",
                        self.variable_name
                    ),
                )
                .with_evidence(Evidence::new().with_occurrences(self.valid_case_count))
                .with_stage("consistency"),
            );
        }
        issues
    }
}

/// Result of checking every variable pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyOutcome {
    /// In W1 column order.
    pub comparisons: Vec<VariableComparison>,
    pub issues: Vec<Issue>,
}

impl ConsistencyOutcome {
    fn new(comparisons: Vec<VariableComparison>) -> Self {
        let issues = comparisons.iter().flat_map(VariableComparison::issues).collect();
        Self {
            comparisons,
            issues,
        }
    }
}

/// Compares same-concept variables across two waves.
pub struct ConsistencyChecker<'a> {
    codebook: &'a Codebook,
    thresholds: StabilityThresholds,
    first_wave: u32,
    second_wave: u32,
}

impl<'a> ConsistencyChecker<'a> {
    pub fn new(codebook: &'a Codebook) -> Self {
        Self {
            codebook,
            thresholds: StabilityThresholds::default(),
            first_wave: 1,
            second_wave: 2,
        }
    }

    pub fn with_thresholds(mut self, thresholds: StabilityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// `(concept, first-wave name, second-wave name)` for every concept named
    /// in both waves, in first-wave order. Waves match on their number, so a
    /// zero-padded `W01_X` pairs with `W02_X`.
    fn pair_names<'n>(
        &self,
        names: impl Iterator<Item = &'n str>,
    ) -> Vec<(String, String, String)> {
        let parsed: Vec<(VariableName, &str)> = names
            .filter_map(|raw| VariableName::parse(raw).map(|name| (name, raw)))
            .collect();

        let mut second: HashMap<&str, &str> = HashMap::new();
        for (name, raw) in parsed.iter().filter(|(n, _)| n.wave == self.second_wave) {
            second.entry(name.concept()).or_insert(raw);
        }

        parsed
            .iter()
            .filter(|(name, _)| name.wave == self.first_wave)
            .filter_map(|(name, raw)| {
                second
                    .get(name.concept())
                    .map(|twin| (name.concept().to_string(), raw.to_string(), twin.to_string()))
            })
            .collect()
    }

    /// Raw column pairs of `table`, in first-wave column order.
    pub fn variable_pairs(&self, table: &DataTable) -> Vec<(String, String, String)> {
        self.pair_names(table.headers.iter().map(String::as_str))
    }

    /// Composite score pairs of a scored table, in scale order.
    pub fn composite_pairs(&self, typed: &TypedTable) -> Vec<(String, String, String)> {
        self.pair_names(
            typed
                .columns
                .iter()
                .filter(|c| matches!(c.origin, ColumnOrigin::Composite { .. }))
                .map(|c| c.name.as_str()),
        )
    }

    /// Comparable numeric values of a raw column. Codebook variables read
    /// their raw code, with missing and unmapped values as `None`; other
    /// columns read any number.
    pub fn column_values(&self, table: &DataTable, raw_name: &str) -> Vec<Option<f64>> {
        let Some(index) = table.column_index(raw_name) else {
            return vec![None; table.row_count()];
        };
        let entry = self.codebook.entry(raw_name);
        table
            .column_values(index)
            .map(|cell| {
                let raw = RawValue::parse(cell);
                match entry {
                    Some(entry) if Recoder::recode_value(entry, &raw).is_missing() => None,
                    _ => raw.as_number(),
                }
            })
            .collect()
    }

    fn value_kind(&self, var_w1: &str, var_w2: &str) -> ValueKind {
        let categorical = self
            .codebook
            .entry(var_w1)
            .or_else(|| self.codebook.entry(var_w2))
            .is_some_and(|e| e.is_categorical());
        if categorical {
            ValueKind::Categorical
        } else {
            ValueKind::Numeric
        }
    }

    /// Compare one pair of columns over the given cohort rows.
    pub fn compare(
        &self,
        table: &DataTable,
        var_w1: &str,
        var_w2: &str,
        cohort: &[usize],
    ) -> VariableComparison {
        let concept = VariableName::parse(var_w1)
            .map(|n| n.concept().to_string())
            .unwrap_or_else(|| var_w1.to_string());
        VariableComparison::compute(
            concept,
            var_w1,
            var_w2,
            &self.column_values(table, var_w1),
            &self.column_values(table, var_w2),
            cohort,
            self.value_kind(var_w1, var_w2),
            &self.thresholds,
        )
    }

    /// Compare every variable pair for the both-wave cohort.
    pub fn check(&self, table: &DataTable, partition: &WavePartition) -> ConsistencyOutcome {
        let cohort = partition.both_cohort();
        let comparisons: Vec<VariableComparison> = self
            .variable_pairs(table)
            .into_iter()
            .map(|(_, var_w1, var_w2)| self.compare(table, &var_w1, &var_w2, &cohort))
            .collect();

        tracing::info!(
            variables = comparisons.len(),
            cohort = cohort.len(),
            "Compared variables across waves"
        );
        ConsistencyOutcome::new(comparisons)
    }

    /// Compare composite scores of the same scale across waves for the
    /// both-wave cohort. Scores are numeric; participants without a score in
    /// either wave are not valid cases.
    pub fn check_composites(
        &self,
        typed: &TypedTable,
        partition: &WavePartition,
    ) -> ConsistencyOutcome {
        let cohort = partition.both_cohort();
        let scores = |name: &str| -> Vec<Option<f64>> {
            typed
                .values(name)
                .map(|v| v.and_then(TypedValue::as_number))
                .collect()
        };

        let comparisons: Vec<VariableComparison> = self
            .composite_pairs(typed)
            .into_iter()
            .map(|(concept, var_w1, var_w2)| {
                VariableComparison::compute(
                    concept,
                    &var_w1,
                    &var_w2,
                    &scores(&var_w1),
                    &scores(&var_w2),
                    &cohort,
                    ValueKind::Numeric,
                    &self.thresholds,
                )
            })
            .collect();

        tracing::info!(
            scales = comparisons.len(),
            cohort = cohort.len(),
            "Compared composite scores across waves"
        );
        ConsistencyOutcome::new(comparisons)
    }
}
