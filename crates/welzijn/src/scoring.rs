//! Composite scale scores: the mean of a fixed set of item codes.
//!
//! Means are taken over the numeric codes of the items, never over label
//! text, and are not renormalised (a 1-5 Likert scale scores in 1-5).
//!
//! # Missing items
//!
//! A participant's composite is computed over the items actually present,
//! provided at least [`ItemPolicy::min_present`] of them are. With every item
//! missing the composite is always missing. Unless configured otherwise the
//! threshold is half of the declared items, rounded up, so a score is never
//! based on a minority of the scale.

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Evidence, Issue, IssueKind, Severity};
use crate::error::{Result, WelzijnError};
use crate::recode::{ColumnOrigin, MissingReason, TypedColumn, TypedRecord, TypedTable, TypedValue};
use crate::stats::{RunningMean, round_to};

/// A composite scale: its output name and the derived item variables it averages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDefinition {
    pub name: String,
    pub items: Vec<String>,
    /// Overrides the run-wide threshold for this scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items_present: Option<usize>,
}

impl ScaleDefinition {
    pub fn new(name: impl Into<String>, items: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            items: items.into_iter().map(Into::into).collect(),
            min_items_present: None,
        }
    }

    pub fn with_min_items_present(mut self, n: usize) -> Self {
        self.min_items_present = Some(n);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(WelzijnError::Codebook(format!(
                "scale '{}' declares no items",
                self.name
            )));
        }
        for (i, item) in self.items.iter().enumerate() {
            if self.items[..i].contains(item) {
                return Err(WelzijnError::Codebook(format!(
                    "scale '{}' lists item '{}' twice",
                    self.name, item
                )));
            }
        }
        if let Some(n) = self.min_items_present {
            if n == 0 || n > self.items.len() {
                return Err(WelzijnError::Codebook(format!(
                    "scale '{}' requires {} items present but has {}",
                    self.name,
                    n,
                    self.items.len()
                )));
            }
        }
        Ok(())
    }
}

/// Minimum number of non-missing items needed for a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPolicy {
    pub min_present: usize,
}

impl ItemPolicy {
    /// A mean whenever at least one item is present.
    pub fn any_present() -> Self {
        Self { min_present: 1 }
    }

    pub fn at_least(n: usize) -> Self {
        Self {
            min_present: n.max(1),
        }
    }

    /// At least half of `n_items`, rounded up.
    pub fn half_of(n_items: usize) -> Self {
        Self::at_least(n_items.div_ceil(2))
    }
}

/// A participant's composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeScore {
    /// The mean, or `None` when too few items were present.
    pub value: Option<f64>,
    pub items_present: usize,
    pub items_declared: usize,
}

impl CompositeScore {
    /// Score a set of item values under `policy`.
    pub fn compute(items: &[Option<f64>], policy: ItemPolicy) -> Self {
        let present: Vec<f64> = items.iter().flatten().copied().collect();
        let items_present = present.len();
        let value = (items_present > 0 && items_present >= policy.min_present)
            .then(|| present.iter().sum::<f64>() / items_present as f64);
        Self {
            value,
            items_present,
            items_declared: items.len(),
        }
    }

    fn to_typed(self) -> TypedValue {
        match self.value {
            Some(v) => TypedValue::Number(v),
            None if self.items_present == 0 => TypedValue::Missing(MissingReason::Absent),
            None => TypedValue::Missing(MissingReason::InsufficientItems),
        }
    }
}

/// Per-scale outcome of a scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSummary {
    pub scale: String,
    pub items: usize,
    pub min_items_present: usize,
    /// Participants with a composite.
    pub scored: usize,
    /// Participants with some, but too few, items present.
    pub insufficient: usize,
    /// Participants with every item missing.
    pub all_missing: usize,
    /// Mean composite over scored participants, 2 decimals.
    pub mean: Option<f64>,
}

/// Result of scoring a typed table.
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    /// Input table plus one numeric column per scored scale.
    pub table: TypedTable,
    pub summaries: Vec<ScaleSummary>,
    pub issues: Vec<Issue>,
}

/// Computes composite scores.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    /// Run-wide threshold; `None` means half of each scale's items.
    min_items_present: Option<usize>,
}

impl CompositeScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_items_present(min_items_present: Option<usize>) -> Self {
        Self { min_items_present }
    }

    /// Effective policy for a scale, clamped to its item count.
    pub fn policy_for(&self, scale: &ScaleDefinition) -> ItemPolicy {
        let n = scale.items.len();
        match scale.min_items_present.or(self.min_items_present) {
            Some(min) => ItemPolicy::at_least(min.min(n)),
            None => ItemPolicy::half_of(n),
        }
    }

    /// Score one participant.
    pub fn score_record(&self, record: &TypedRecord, scale: &ScaleDefinition) -> CompositeScore {
        let items: Vec<Option<f64>> = scale.items.iter().map(|item| record.number(item)).collect();
        CompositeScore::compute(&items, self.policy_for(scale))
    }

    /// Add a composite column per scale to a copy of `table`. Scales with an
    /// item column absent from the table are skipped and reported.
    pub fn score_table(&self, table: &TypedTable, scales: &[ScaleDefinition]) -> ScoringOutcome {
        let mut scored = table.clone();
        let mut summaries = Vec::new();
        let mut issues = Vec::new();

        for scale in scales {
            let absent: Vec<&str> = scale
                .items
                .iter()
                .filter(|item| !table.has_column(item))
                .map(String::as_str)
                .collect();
            if !absent.is_empty() {
                issues.push(
                    Issue::new(
                        IssueKind::MissingInput,
                        Severity::Warning,
                        scale.name.clone(),
                        format!(
                            "Scale '{}' skipped: item(s) {} not available",
                            scale.name,
                            absent.join(", ")
                        ),
                    )
                    .with_evidence(Evidence::new().with_values(absent.clone()))
                    .with_stage("scoring"),
                );
                continue;
            }

            let policy = self.policy_for(scale);
            let mut summary = ScaleSummary {
                scale: scale.name.clone(),
                items: scale.items.len(),
                min_items_present: policy.min_present,
                scored: 0,
                insufficient: 0,
                all_missing: 0,
                mean: None,
            };
            let mut scores = RunningMean::new();

            for record in &mut scored.records {
                let score = self.score_record(record, scale);
                match score.value {
                    Some(v) => {
                        summary.scored += 1;
                        scores.add(v);
                    }
                    None if score.items_present == 0 => summary.all_missing += 1,
                    None => summary.insufficient += 1,
                }
                record.values.insert(scale.name.clone(), score.to_typed());
            }
            summary.mean = scores.mean().map(|m| round_to(m, 2));

            scored.columns.push(TypedColumn {
                name: scale.name.clone(),
                origin: ColumnOrigin::Composite {
                    items: scale.items.clone(),
                },
            });

            tracing::debug!(
                scale = %scale.name,
                scored = summary.scored,
                insufficient = summary.insufficient,
                all_missing = summary.all_missing,
                "Computed composite"
            );
            summaries.push(summary);
        }

        tracing::info!(scales = summaries.len(), skipped = issues.len(), "Scored composite scales");

        ScoringOutcome {
            table: scored,
            summaries,
            issues,
        }
    }
}
