//! Welzijn: data preparation for the two-wave Corona & Welzijn survey.
//!
//! A raw survey export is recoded with a declarative codebook, composite
//! scale scores are computed, participants are partitioned by the waves they
//! took part in, and variables measured in both waves are compared for the
//! both-wave cohort. Everything ends up in one ranked summary report.
//!
//! # Core Principles
//!
//! - **Declarative**: every recoding rule lives in the [`Codebook`]
//! - **Non-destructive**: each stage reads its input and returns a new value
//! - **Never silent**: data problems become [`Issue`]s, not crashes or zeroes
//!
//! # Example
//!
//! ```no_run
//! use welzijn::Pipeline;
//!
//! let result = Pipeline::new().run("corona_welzijn.csv").unwrap();
//!
//! println!("Both waves: {}", result.report.participation.both);
//! for c in &result.report.comparisons {
//!     println!("{}: {:?}", c.variable_name, c.percent_identical);
//! }
//! ```

pub mod codebook;
pub mod config;
pub mod consistency;
pub mod diagnostics;
pub mod error;
pub mod input;
pub mod output;
pub mod recode;
pub mod report;
pub mod scoring;
pub mod stats;
pub mod waves;

mod pipeline;

pub use crate::pipeline::{Pipeline, PipelineResult};
pub use codebook::{Codebook, CodebookEntry, ItemTemplate, VariableKind, VariableName};
pub use config::{PipelineConfig, ScoringConfig};
pub use consistency::{ConsistencyChecker, Stability, StabilityThresholds, VariableComparison};
pub use diagnostics::{Issue, IssueKind, Severity};
pub use error::{Result, WelzijnError};
pub use input::{DataTable, Parser, SourceMetadata};
pub use recode::{Recoder, TypedTable, TypedValue};
pub use report::{ReportAggregator, SummaryReport, render_text};
pub use scoring::{CompositeScorer, ItemPolicy, ScaleDefinition};
pub use waves::{WaveCounts, WaveMatcher, WaveParticipation, WavePartition};
