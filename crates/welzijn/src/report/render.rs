//! Plain-text rendering of a [`SummaryReport`].

use std::fmt::Write;

use super::SummaryReport;
use crate::consistency::VariableComparison;

fn or_na(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
}

fn comparison_table(out: &mut String, comparisons: &[VariableComparison]) {
    let _ = writeln!(
        out,
        "{:<20} {:>6} {:>6} {:>8} {:>7} {:>8} {:>8}  {}",
        "variable", "valid", "same", "% same", "r", "mean W1", "mean W2", "stability"
    );
    for c in comparisons {
        let _ = writeln!(
            out,
            "{:<20} {:>6} {:>6} {:>8} {:>7} {:>8} {:>8}  {}",
            c.variable_name,
            c.valid_case_count,
            c.identical_count,
            or_na(c.percent_identical, 1),
            or_na(c.correlation, 3),
            or_na(c.mean_w1, 2),
            or_na(c.mean_w2, 2),
            c.stability.label()
        );
    }
}

/// Render the human-readable report.
pub fn render_text(report: &SummaryReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Corona & Welzijn data preparation report");
    let _ = writeln!(out, "Source:   {} ({} rows, {} columns)", report.source.file, report.source.row_count, report.source.column_count);
    let _ = writeln!(out, "Codebook: {}", report.codebook);
    let _ = writeln!(out, "Run at:   {}", report.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC"));

    heading(&mut out, "Variable naming");
    let n = &report.naming;
    let _ = writeln!(out, "Total columns:        {}", n.total_columns);
    let _ = writeln!(out, "Wave 1 (W1_*):        {}", n.w1_columns);
    let _ = writeln!(out, "Wave 2 (W2_*):        {}", n.w2_columns);
    if n.other_wave_columns > 0 {
        let _ = writeln!(out, "Other waves:          {}", n.other_wave_columns);
    }
    let _ = writeln!(out, "Without wave prefix:  {}", n.unprefixed_columns);
    let _ = writeln!(out, "Item-indexed columns: {}", n.item_columns);
    let _ = writeln!(out, "Measured in both:     {}", n.common_concepts.len());
    if !n.only_w1_concepts.is_empty() {
        let _ = writeln!(out, "Only in wave 1:       {}", n.only_w1_concepts.join(", "));
    }
    if !n.only_w2_concepts.is_empty() {
        let _ = writeln!(out, "Only in wave 2:       {}", n.only_w2_concepts.join(", "));
    }

    heading(&mut out, "Wave participation");
    let tab = &report.crosstab;
    let _ = writeln!(out, "{:>10} {:>8} {:>8} {:>8}", "", "W2 = 0", "W2 = 1", "total");
    for (label, in_w1) in [("W1 = 0", false), ("W1 = 1", true)] {
        let _ = writeln!(
            out,
            "{:>10} {:>8} {:>8} {:>8}",
            label,
            tab.get(in_w1, false),
            tab.get(in_w1, true),
            tab.w1_total(in_w1)
        );
    }
    let _ = writeln!(out, "{:>10} {:>8} {:>8} {:>8}", "total", tab.w2_total(false), tab.w2_total(true), tab.total());
    let p = &report.participation;
    if p.unknown > 0 {
        let _ = writeln!(out, "Unknown indicator: {}", p.unknown);
    }
    let _ = writeln!(out, "Participants: {}", p.total);

    heading(&mut out, "Cross-wave consistency (both-wave cohort, ranked)");
    if report.comparisons.is_empty() {
        let _ = writeln!(out, "No variables measured in both waves.");
    } else {
        comparison_table(&mut out, &report.comparisons);
    }

    if !report.composite_comparisons.is_empty() {
        heading(&mut out, "Composite scores across waves (both-wave cohort, ranked)");
        comparison_table(&mut out, &report.composite_comparisons);
    }

    heading(&mut out, "Stability");
    let b = &report.buckets;
    let _ = writeln!(out, "Identical ({}%):         {}", report.thresholds.stable, list(&b.stable));
    let _ = writeln!(out, "Moderate:               {}", list(&b.moderate));
    let _ = writeln!(out, "Unstable (< {}%):       {}", report.thresholds.unstable_below, list(&b.unstable));
    let _ = writeln!(out, "Not computable:         {}", list(&b.not_computable));

    if !report.scales.is_empty() {
        heading(&mut out, "Composite scales");
        for s in &report.scales {
            let _ = writeln!(
                out,
                "{:<22} items {:>2}  min {:>2}  scored {:>5}  too few {:>5}  empty {:>5}  mean {}",
                s.scale,
                s.items,
                s.min_items_present,
                s.scored,
                s.insufficient,
                s.all_missing,
                or_na(s.mean, 2)
            );
        }
    }

    let noisy: Vec<_> = report
        .recode
        .variables
        .values()
        .filter(|v| v.unmapped > 0)
        .collect();
    if !noisy.is_empty() || !report.recode.missing_inputs.is_empty() {
        heading(&mut out, "Recoding");
        for v in noisy {
            let values: Vec<String> = v
                .unmapped_values
                .iter()
                .map(|(value, count)| format!("{} x{}", value, count))
                .collect();
            let _ = writeln!(
                out,
                "{:<22} unmapped {:>4} ({})  declared missing {:>4}",
                v.raw_name,
                v.unmapped,
                values.join(", "),
                v.declared_missing
            );
        }
        if !report.recode.missing_inputs.is_empty() {
            let _ = writeln!(out, "Not in data: {}", report.recode.missing_inputs.join(", "));
        }
    }

    if !report.issues.is_empty() {
        heading(&mut out, "Issues");
        let c = &report.issue_counts;
        let _ = writeln!(out, "{} errors, {} warnings, {} info", c.error, c.warning, c.info);
        for issue in &report.issues {
            let _ = writeln!(
                out,
                "[{}] {} ({}): {}",
                issue.severity.label(),
                issue.kind.label(),
                issue.variable,
                issue.description
            );
        }
    }

    heading(&mut out, "Interpretation");
    for line in &report.narrative {
        let _ = writeln!(out, "- {}", line);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::{StabilityThresholds, ValueKind, VariableComparison};
    use crate::input::{DataTable, SourceMetadata};
    use crate::recode::RecodeDiagnostics;
    use crate::report::{ReportAggregator, ReportInputs};
    use crate::waves::WaveMatcher;

    #[test]
    fn test_render_sections_and_na() {
        let table = DataTable::new(
            vec!["Nummer".to_string(), "W1".to_string(), "W2".to_string()],
            vec![vec!["1".to_string(), "1".to_string(), "1".to_string()]],
            b',',
        );
        let comparison = VariableComparison {
            variable_name: "Opleiding".to_string(),
            var_w1: "W1_Opleiding".to_string(),
            var_w2: "W2_Opleiding".to_string(),
            valid_case_count: 0,
            identical_count: 0,
            percent_identical: None,
            correlation: None,
            mean_w1: None,
            mean_w2: None,
            value_kind: ValueKind::Categorical,
            stability: StabilityThresholds::default().classify(0, 0),
        };
        let report = ReportAggregator::new().aggregate(ReportInputs {
            source: SourceMetadata::in_memory(&table),
            codebook: "test".to_string(),
            headers: table.headers.clone(),
            partition: WaveMatcher::default().partition(&table, "Nummer"),
            comparisons: vec![comparison.clone()],
            composite_comparisons: vec![VariableComparison {
                variable_name: "Eenzaam_Gem".to_string(),
                ..comparison
            }],
            scales: Vec::new(),
            recode: RecodeDiagnostics::default(),
            issues: Vec::new(),
        });

        let text = render_text(&report);
        assert!(text.contains("Wave participation"));
        assert!(text.contains("Cross-wave consistency"));
        assert!(text.contains("Opleiding"));
        assert!(text.contains("n/a"));
        assert!(text.contains("not computable"));
        assert!(text.contains("Composite scores across waves"));
        assert!(text.contains("Eenzaam_Gem"));
        assert!(!text.contains("NaN"));
    }
}
