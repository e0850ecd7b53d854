//! Report Aggregator: folds the stage outputs into one summary.
//!
//! Aggregation performs no new statistics. It orders, groups and counts what
//! the earlier stages produced, and phrases a short narrative around it.

mod render;

pub use render::render_text;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::codebook::VariableName;
use crate::consistency::{Stability, StabilityThresholds, VariableComparison};
use crate::diagnostics::{Issue, IssueCounts, IssueKind};
use crate::input::SourceMetadata;
use crate::recode::RecodeDiagnostics;
use crate::scoring::ScaleSummary;
use crate::waves::{CrossTab, WaveCounts, WavePartition};

/// How the columns of the loaded table split over the naming convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingBreakdown {
    pub total_columns: usize,
    /// Columns named `W1_...`.
    pub w1_columns: usize,
    /// Columns named `W2_...`.
    pub w2_columns: usize,
    /// Columns of any other wave.
    pub other_wave_columns: usize,
    /// Columns outside the wave convention (`Nummer`, `W1`, `W2`, ...).
    pub unprefixed_columns: usize,
    /// Wave columns carrying a trailing item index, e.g. `W1_Corstress3`.
    pub item_columns: usize,
    /// Concepts measured in both waves, in first-wave order.
    pub common_concepts: Vec<String>,
    pub only_w1_concepts: Vec<String>,
    pub only_w2_concepts: Vec<String>,
}

impl NamingBreakdown {
    pub fn from_headers(headers: &[String]) -> Self {
        let mut breakdown = NamingBreakdown {
            total_columns: headers.len(),
            ..Default::default()
        };
        let mut w1 = IndexSet::new();
        let mut w2 = IndexSet::new();

        for header in headers {
            let Some(name) = VariableName::parse(header) else {
                breakdown.unprefixed_columns += 1;
                continue;
            };
            if name.item.is_some() {
                breakdown.item_columns += 1;
            }
            match name.wave {
                1 => {
                    breakdown.w1_columns += 1;
                    w1.insert(name.concept().to_string());
                }
                2 => {
                    breakdown.w2_columns += 1;
                    w2.insert(name.concept().to_string());
                }
                _ => breakdown.other_wave_columns += 1,
            }
        }

        breakdown.common_concepts = w1.intersection(&w2).cloned().collect();
        breakdown.only_w1_concepts = w1.difference(&w2).cloned().collect();
        breakdown.only_w2_concepts = w2.difference(&w1).cloned().collect();
        breakdown
    }
}

/// Concept names per stability bucket, in ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityBuckets {
    pub stable: Vec<String>,
    pub moderate: Vec<String>,
    pub unstable: Vec<String>,
    pub not_computable: Vec<String>,
}

impl StabilityBuckets {
    fn from_ranked(ranked: &[&VariableComparison]) -> Self {
        let mut buckets = StabilityBuckets::default();
        for c in ranked {
            let bucket = match c.stability {
                Stability::Stable => &mut buckets.stable,
                Stability::Moderate => &mut buckets.moderate,
                Stability::Unstable => &mut buckets.unstable,
                Stability::NotComputable => &mut buckets.not_computable,
            };
            bucket.push(c.variable_name.clone());
        }
        buckets
    }
}

/// Order comparisons by `percent_identical`, highest first.
///
/// The sort is stable: ties keep declaration order. Comparisons without a
/// percentage go last.
pub fn rank(comparisons: &[VariableComparison]) -> Vec<&VariableComparison> {
    let mut ranked: Vec<&VariableComparison> = comparisons.iter().collect();
    ranked.sort_by(|a, b| match (a.percent_identical, b.percent_identical) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    ranked
}

/// Everything the aggregator folds into a report.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub source: SourceMetadata,
    pub codebook: String,
    pub headers: Vec<String>,
    pub partition: WavePartition,
    /// In declaration order.
    pub comparisons: Vec<VariableComparison>,
    /// Composite scores of the same scale across waves, in scale order.
    pub composite_comparisons: Vec<VariableComparison>,
    pub scales: Vec<ScaleSummary>,
    pub recode: RecodeDiagnostics,
    pub issues: Vec<Issue>,
}

/// The summary handed to the sinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub source: SourceMetadata,
    /// Name of the codebook used for recoding.
    pub codebook: String,
    pub analyzed_at: DateTime<Utc>,
    pub naming: NamingBreakdown,
    pub participation: WaveCounts,
    pub crosstab: CrossTab,
    pub thresholds: StabilityThresholds,
    /// Ranked, highest agreement first.
    pub comparisons: Vec<VariableComparison>,
    pub buckets: StabilityBuckets,
    /// Composite scores across waves, ranked like `comparisons`.
    pub composite_comparisons: Vec<VariableComparison>,
    pub scales: Vec<ScaleSummary>,
    pub recode: RecodeDiagnostics,
    pub issues: Vec<Issue>,
    pub issue_counts: IssueCounts,
    pub narrative: Vec<String>,
}

impl SummaryReport {
    /// Whether any study-design invariant was violated.
    pub fn has_invariant_violations(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.kind == IssueKind::InvariantViolation)
    }

    pub fn comparison(&self, variable_name: &str) -> Option<&VariableComparison> {
        self.comparisons
            .iter()
            .find(|c| c.variable_name == variable_name)
    }
}

/// Folds stage outputs into a [`SummaryReport`].
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    thresholds: StabilityThresholds,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: StabilityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn aggregate(&self, inputs: ReportInputs) -> SummaryReport {
        let ranked = rank(&inputs.comparisons);
        let buckets = StabilityBuckets::from_ranked(&ranked);
        let comparisons: Vec<VariableComparison> = ranked.into_iter().cloned().collect();
        let composite_comparisons: Vec<VariableComparison> =
            rank(&inputs.composite_comparisons).into_iter().cloned().collect();

        let counts = inputs.partition.counts;
        let mut narrative =
            self.narrative(&counts, &buckets, &comparisons, &inputs.scales, &inputs.recode);
        narrative.extend(composite_comparisons.iter().map(|c| self.composite_line(c)));

        SummaryReport {
            naming: NamingBreakdown::from_headers(&inputs.headers),
            participation: counts,
            crosstab: counts.crosstab(),
            thresholds: self.thresholds,
            issue_counts: IssueCounts::tally(&inputs.issues),
            source: inputs.source,
            codebook: inputs.codebook,
            analyzed_at: Utc::now(),
            comparisons,
            buckets,
            composite_comparisons,
            scales: inputs.scales,
            recode: inputs.recode,
            issues: inputs.issues,
            narrative,
        }
    }

    fn composite_line(&self, c: &VariableComparison) -> String {
        match c.percent_identical {
            None => format!(
                "Composite {} could not be compared: no both-wave participant was scored in both waves.",
                c.variable_name
            ),
            Some(percent) => {
                let correlation = c
                    .correlation
                    .map(|r| format!(", r = {:.3}", r))
                    .unwrap_or_default();
                format!(
                    "Composite {}: {:.1}% of {} both-wave participant(s) scored identically in both waves{} ({}).",
                    c.variable_name,
                    percent,
                    c.valid_case_count,
                    correlation,
                    c.stability.label()
                )
            }
        }
    }

    fn narrative(
        &self,
        counts: &WaveCounts,
        buckets: &StabilityBuckets,
        comparisons: &[VariableComparison],
        scales: &[ScaleSummary],
        recode: &RecodeDiagnostics,
    ) -> Vec<String> {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} participants: {} took part in both waves, {} only in wave 1 and {} only in wave 2.",
            counts.total, counts.both, counts.only_w1, counts.only_w2
        ));
        if counts.neither > 0 {
            lines.push(format!(
                "{} participant(s) are marked as taking part in neither wave. Every participant should have completed at least one wave; these records are left out of the cross-wave comparison.",
                counts.neither
            ));
        }
        if counts.unknown > 0 {
            lines.push(format!(
                "{} participant(s) have a missing or non-binary wave indicator and are left out of the cross-wave comparison.",
                counts.unknown
            ));
        }

        if comparisons.is_empty() {
            lines.push("No variable is measured in both waves, so nothing was compared.".to_string());
        }
        if !buckets.stable.is_empty() {
            let agreement = if self.thresholds.stable >= 100.0 {
                "are identical for every both-wave participant".to_string()
            } else {
                format!("agree for at least {}% of both-wave participants", self.thresholds.stable)
            };
            lines.push(format!(
                "{} variable(s) {} ({}). These should not change and confirm measurement stability.",
                buckets.stable.len(),
                agreement,
                buckets.stable.join(", ")
            ));
        }
        if !buckets.unstable.is_empty() {
            lines.push(format!(
                "{} variable(s) agree for fewer than {}% of participants ({}). High instability: investigate true change versus measurement or coding error.",
                buckets.unstable.len(),
                self.thresholds.unstable_below,
                buckets.unstable.join(", ")
            ));
        }
        if !buckets.not_computable.is_empty() {
            lines.push(format!(
                "{} variable(s) could not be compared because no both-wave participant has values in both waves ({}).",
                buckets.not_computable.len(),
                buckets.not_computable.join(", ")
            ));
        }

        for scale in scales {
            match scale.mean {
                Some(mean) => lines.push(format!(
                    "Scale {}: {} participant(s) scored (at least {} of {} items), mean {:.2}.",
                    scale.scale, scale.scored, scale.min_items_present, scale.items, mean
                )),
                None => lines.push(format!(
                    "Scale {}: no participant answered enough items to be scored.",
                    scale.scale
                )),
            }
        }

        let unmapped = recode.total_unmapped();
        if unmapped > 0 {
            lines.push(format!(
                "{} raw value(s) fell outside the codebook's declared levels and were treated as missing.",
                unmapped
            ));
        }
        if !recode.missing_inputs.is_empty() {
            lines.push(format!(
                "{} codebook variable(s) were not found in the data and were skipped.",
                recode.missing_inputs.len()
            ));
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::ValueKind;
    use crate::input::DataTable;

    /// A comparison over 10 valid cases, or none when `identical` is `None`.
    fn comparison(name: &str, identical: Option<usize>) -> VariableComparison {
        let valid = if identical.is_some() { 10 } else { 0 };
        let identical = identical.unwrap_or(0);
        VariableComparison {
            variable_name: name.to_string(),
            var_w1: format!("W1_{}", name),
            var_w2: format!("W2_{}", name),
            valid_case_count: valid,
            identical_count: identical,
            percent_identical: (valid > 0).then(|| identical as f64 * 10.0),
            correlation: None,
            mean_w1: None,
            mean_w2: None,
            value_kind: ValueKind::Numeric,
            stability: StabilityThresholds::default().classify(identical, valid),
        }
    }

    fn inputs(comparisons: Vec<VariableComparison>) -> ReportInputs {
        let table = DataTable::new(
            vec!["Nummer".to_string(), "W1".to_string(), "W2".to_string()],
            vec![
                vec!["1".to_string(), "1".to_string(), "1".to_string()],
                vec!["2".to_string(), "0".to_string(), "0".to_string()],
            ],
            b',',
        );
        ReportInputs {
            source: SourceMetadata::in_memory(&table),
            codebook: "test".to_string(),
            headers: table.headers.clone(),
            partition: crate::waves::WaveMatcher::default().partition(&table, "Nummer"),
            comparisons,
            composite_comparisons: Vec::new(),
            scales: Vec::new(),
            recode: RecodeDiagnostics::default(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_rank_is_stable_and_puts_not_computable_last() {
        let comparisons = vec![
            comparison("A", Some(8)),
            comparison("B", None),
            comparison("C", Some(10)),
            comparison("D", Some(8)),
            comparison("E", Some(2)),
        ];
        let names: Vec<&str> = rank(&comparisons)
            .iter()
            .map(|c| c.variable_name.as_str())
            .collect();
        assert_eq!(names, vec!["C", "A", "D", "E", "B"]);
    }

    #[test]
    fn test_not_computable_stays_out_of_extreme_buckets() {
        let report = ReportAggregator::new().aggregate(inputs(vec![
            comparison("Stabiel", Some(10)),
            comparison("Leeg", None),
            comparison("Wisselend", Some(3)),
        ]));
        assert_eq!(report.buckets.stable, vec!["Stabiel"]);
        assert_eq!(report.buckets.unstable, vec!["Wisselend"]);
        assert_eq!(report.buckets.not_computable, vec!["Leeg"]);
        assert!(report.buckets.moderate.is_empty());
    }

    #[test]
    fn test_narrative_mentions_buckets_and_violations() {
        let report = ReportAggregator::new().aggregate(inputs(vec![
            comparison("Geslacht", Some(10)),
            comparison("Gezondheid", Some(4)),
        ]));
        let text = report.narrative.join("\n");
        assert!(text.contains("confirm measurement stability"));
        assert!(text.contains("Gezondheid"));
        assert!(text.contains("neither wave"));
        assert_eq!(report.participation.neither, 1);
    }

    #[test]
    fn test_naming_breakdown() {
        let headers: Vec<String> = [
            "Nummer",
            "W1",
            "W2",
            "W1_Geslacht",
            "W1_Corstress1",
            "W1_Corstress2",
            "W1_Alleen",
            "W2_Geslacht",
            "W2_Corstress1",
            "W2_Nieuw",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let naming = NamingBreakdown::from_headers(&headers);
        assert_eq!(naming.total_columns, 10);
        assert_eq!(naming.w1_columns, 4);
        assert_eq!(naming.w2_columns, 3);
        assert_eq!(naming.unprefixed_columns, 3);
        assert_eq!(naming.item_columns, 3);
        assert_eq!(naming.common_concepts, vec!["Geslacht", "Corstress1"]);
        assert_eq!(naming.only_w1_concepts, vec!["Corstress2", "Alleen"]);
        assert_eq!(naming.only_w2_concepts, vec!["Nieuw"]);
    }

    #[test]
    fn test_composite_comparisons_are_ranked_apart() {
        let mut inputs = inputs(vec![comparison("Geslacht", Some(10))]);
        inputs.composite_comparisons = vec![
            comparison("Eenzaam_Gem", Some(3)),
            comparison("Corstress_Gem", Some(7)),
        ];
        let report = ReportAggregator::new().aggregate(inputs);

        let names: Vec<&str> = report
            .composite_comparisons
            .iter()
            .map(|c| c.variable_name.as_str())
            .collect();
        assert_eq!(names, vec!["Corstress_Gem", "Eenzaam_Gem"]);
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.buckets.unstable, Vec::<String>::new());

        let text = report.narrative.join("\n");
        assert!(text.contains("Composite Eenzaam_Gem: 30.0% of 10"));
        assert!(text.contains("(unstable)"));
    }
}
