//! Codebook entries: how one raw variable is recoded.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WelzijnError};

/// Measurement level of a raw variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Unordered categories (e.g. gender).
    Nominal,
    /// Ordered categories (e.g. education level).
    Ordinal,
    /// Numeric measurement, optionally transformed (e.g. birth year to age).
    Ratio,
    /// One item of a multi-item Likert scale.
    LikertItem,
}

impl VariableKind {
    /// Whether recoded values are labels rather than numbers.
    pub fn is_categorical(&self) -> bool {
        !matches!(self, VariableKind::Ratio)
    }

    pub fn label(&self) -> &'static str {
        match self {
            VariableKind::Nominal => "nominal",
            VariableKind::Ordinal => "ordinal",
            VariableKind::Ratio => "ratio",
            VariableKind::LikertItem => "likert_item",
        }
    }
}

/// One `code -> label` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub code: i64,
    pub label: String,
}

impl Level {
    pub fn new(code: i64, label: impl Into<String>) -> Self {
        Self {
            code,
            label: label.into(),
        }
    }
}

/// Build a level list from `(code, label)` pairs.
pub fn levels(pairs: &[(i64, &str)]) -> Vec<Level> {
    pairs.iter().map(|&(code, label)| Level::new(code, label)).collect()
}

/// Numeric transform applied to ratio variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RatioTransform {
    /// Keep the raw number.
    Identity,
    /// `reference_year - value`, used to turn a birth year into an age.
    YearsSince { reference_year: i32 },
}

/// How a ratio variable is validated and transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRule {
    pub transform: RatioTransform,
    /// Smallest accepted raw value (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest accepted raw value (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl RatioRule {
    pub fn identity() -> Self {
        Self {
            transform: RatioTransform::Identity,
            min: None,
            max: None,
        }
    }

    pub fn years_since(reference_year: i32) -> Self {
        Self {
            transform: RatioTransform::YearsSince { reference_year },
            min: None,
            max: None,
        }
    }

    /// Restrict accepted raw values to `[min, max]`.
    pub fn within(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Transform a raw number. `None` means the value is outside the accepted range.
    pub fn apply(&self, raw: f64) -> Option<f64> {
        if self.min.is_some_and(|min| raw < min) || self.max.is_some_and(|max| raw > max) {
            return None;
        }
        Some(match self.transform {
            RatioTransform::Identity => raw,
            RatioTransform::YearsSince { reference_year } => f64::from(reference_year) - raw,
        })
    }
}

/// Describes one raw variable and its recoding rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebookEntry {
    /// Column name in the raw export.
    pub raw_name: String,
    /// Column name of the recoded variable. Equal to `raw_name` when the
    /// recoded column replaces the raw one.
    pub derived_name: String,
    pub kind: VariableKind,
    /// Declared codes in presentation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioRule>,
}

impl CodebookEntry {
    /// Unordered categorical variable; the recoded column replaces the raw one.
    pub fn nominal(raw_name: impl Into<String>, levels: Vec<Level>) -> Self {
        let raw_name = raw_name.into();
        Self {
            derived_name: raw_name.clone(),
            raw_name,
            kind: VariableKind::Nominal,
            levels,
            ordered: false,
            ratio: None,
        }
    }

    /// Ordered categorical variable; the recoded column replaces the raw one.
    pub fn ordinal(raw_name: impl Into<String>, levels: Vec<Level>) -> Self {
        Self {
            kind: VariableKind::Ordinal,
            ordered: true,
            ..Self::nominal(raw_name, levels)
        }
    }

    /// Numeric variable written to `derived_name`.
    pub fn ratio(
        raw_name: impl Into<String>,
        derived_name: impl Into<String>,
        rule: RatioRule,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            derived_name: derived_name.into(),
            kind: VariableKind::Ratio,
            levels: Vec::new(),
            ordered: false,
            ratio: Some(rule),
        }
    }

    /// Label for a declared code.
    pub fn label_for(&self, code: i64) -> Option<&str> {
        self.levels
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.label.as_str())
    }

    /// Reverse mapping from a label back to its raw code.
    pub fn code_for(&self, label: &str) -> Option<i64> {
        self.levels.iter().find(|l| l.label == label).map(|l| l.code)
    }

    pub fn is_categorical(&self) -> bool {
        self.kind.is_categorical()
    }

    /// Check the structural invariants of this entry.
    pub fn validate(&self) -> Result<()> {
        if self.raw_name.trim().is_empty() || self.derived_name.trim().is_empty() {
            return Err(WelzijnError::Codebook(
                "entry with an empty variable name".to_string(),
            ));
        }

        if self.is_categorical() {
            if self.levels.is_empty() {
                return Err(WelzijnError::Codebook(format!(
                    "'{}' is {} but declares no levels",
                    self.raw_name,
                    self.kind.label()
                )));
            }
            let mut codes = HashSet::new();
            let mut labels = HashSet::new();
            for level in &self.levels {
                if !codes.insert(level.code) {
                    return Err(WelzijnError::Codebook(format!(
                        "'{}' declares code {} more than once",
                        self.raw_name, level.code
                    )));
                }
                if !labels.insert(level.label.as_str()) {
                    return Err(WelzijnError::Codebook(format!(
                        "'{}' declares label '{}' more than once",
                        self.raw_name, level.label
                    )));
                }
            }
        } else {
            let Some(rule) = &self.ratio else {
                return Err(WelzijnError::Codebook(format!(
                    "ratio variable '{}' has no transform",
                    self.raw_name
                )));
            };
            if let (Some(min), Some(max)) = (rule.min, rule.max) {
                if min > max {
                    return Err(WelzijnError::Codebook(format!(
                        "'{}' has an empty accepted range [{}, {}]",
                        self.raw_name, min, max
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A Likert item block declared once and expanded to `prefix{first..=last}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Raw name prefix, e.g. `W1_Corstress`.
    pub prefix: String,
    /// Prefix for the recoded columns; defaults to `prefix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_prefix: Option<String>,
    pub first: u32,
    pub last: u32,
    /// Shared level map for every item.
    pub levels: Vec<Level>,
}

impl ItemTemplate {
    pub fn new(prefix: impl Into<String>, first: u32, last: u32, levels: Vec<Level>) -> Self {
        Self {
            prefix: prefix.into(),
            derived_prefix: None,
            first,
            last,
            levels,
        }
    }

    /// Raw column names covered by this template.
    pub fn item_names(&self) -> Vec<String> {
        (self.first..=self.last)
            .map(|i| format!("{}{}", self.prefix, i))
            .collect()
    }

    /// Recoded column names covered by this template.
    pub fn derived_names(&self) -> Vec<String> {
        let prefix = self.derived_prefix.as_deref().unwrap_or(&self.prefix);
        (self.first..=self.last)
            .map(|i| format!("{}{}", prefix, i))
            .collect()
    }

    /// One `likert_item` entry per index.
    pub fn expand(&self) -> Vec<CodebookEntry> {
        self.item_names()
            .into_iter()
            .zip(self.derived_names())
            .map(|(raw_name, derived_name)| CodebookEntry {
                raw_name,
                derived_name,
                kind: VariableKind::LikertItem,
                levels: self.levels.clone(),
                ordered: true,
                ratio: None,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.first > self.last {
            return Err(WelzijnError::Codebook(format!(
                "item template '{}' has an empty range {}..={}",
                self.prefix, self.first, self.last
            )));
        }
        Ok(())
    }
}
