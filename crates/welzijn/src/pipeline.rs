//! The end-to-end run: load, recode, score, match waves, compare, report.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::codebook::Codebook;
use crate::config::PipelineConfig;
use crate::consistency::ConsistencyChecker;
use crate::diagnostics::{Issue, IssueKind, Severity};
use crate::error::Result;
use crate::input::{DataTable, Parser, SourceMetadata};
use crate::output;
use crate::recode::{Recoder, TypedTable};
use crate::report::{ReportAggregator, ReportInputs, SummaryReport};
use crate::scoring::CompositeScorer;
use crate::waves::{WaveMatcher, WavePartition};

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The table as loaded.
    pub table: DataTable,
    /// Recoded variables plus composite scores.
    pub typed: TypedTable,
    pub partition: WavePartition,
    pub report: SummaryReport,
}

impl PipelineResult {
    pub fn source(&self) -> &SourceMetadata {
        &self.report.source
    }

    pub fn issues(&self) -> &[Issue] {
        &self.report.issues
    }

    /// Write the recoded dataset into `dir`, named after the source file and `date`.
    pub fn write_recoded(&self, dir: impl AsRef<Path>, date: NaiveDate) -> Result<PathBuf> {
        output::write_recoded(dir, &self.report.source.path, date, &self.table, &self.typed)
    }
}

/// The survey preparation pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    codebook: Codebook,
    parser: Parser,
}

impl Pipeline {
    /// Pipeline with the default configuration and the built-in codebook.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        Self {
            config,
            codebook: Codebook::corona_welzijn(),
            parser,
        }
    }

    /// Use a different codebook.
    pub fn with_codebook(mut self, codebook: Codebook) -> Self {
        self.codebook = codebook;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    /// Load a survey export and run every stage on it.
    ///
    /// Only loading can fail. Data problems found along the way end up in
    /// the report's issues.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<PipelineResult> {
        let (table, source) = self.parser.parse_file(path)?;
        Ok(self.run_table(table, source))
    }

    /// Run every stage on an already loaded table.
    pub fn run_table(&self, table: DataTable, source: SourceMetadata) -> PipelineResult {
        let config = &self.config;
        let mut issues = Vec::new();

        if !table.has_column(&config.id_column) {
            issues.push(
                Issue::new(
                    IssueKind::MissingInput,
                    Severity::Warning,
                    config.id_column.clone(),
                    format!(
                        "Id column '{}' is absent; participants are identified by row number",
                        config.id_column
                    ),
                )
                .with_stage("load"),
            );
        }

        let recoded = Recoder::new(&self.codebook).recode_table(&table, &config.id_column);
        issues.extend(recoded.diagnostics.issues());

        let scoring = CompositeScorer::with_min_items_present(config.scoring.min_items_present)
            .score_table(&recoded, self.codebook.scales());
        issues.extend(scoring.issues);

        let partition = WaveMatcher::new(&config.w1_column, &config.w2_column)
            .partition(&table, &config.id_column);
        issues.extend(partition.issues.iter().cloned());

        let checker = ConsistencyChecker::new(&self.codebook).with_thresholds(config.stability);
        let consistency = checker.check(&table, &partition);
        issues.extend(consistency.issues);
        let composites = checker.check_composites(&scoring.table, &partition);
        issues.extend(composites.issues);

        for issue in &issues {
            issue.log();
        }

        let typed = scoring.table;
        let report = ReportAggregator::with_thresholds(config.stability).aggregate(ReportInputs {
            source,
            codebook: self.codebook.name().to_string(),
            headers: table.headers.clone(),
            partition: partition.clone(),
            comparisons: consistency.comparisons,
            composite_comparisons: composites.comparisons,
            scales: scoring.summaries,
            recode: typed.diagnostics.clone(),
            issues,
        });

        tracing::info!(
            participants = report.participation.total,
            compared = report.comparisons.len(),
            errors = report.issue_counts.error,
            warnings = report.issue_counts.warning,
            "Pipeline finished"
        );

        PipelineResult {
            table,
            typed,
            partition,
            report,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
