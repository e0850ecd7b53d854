//! Typed values and the recoded table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codebook::VariableKind;

use super::recoder::RecodeDiagnostics;

/// Why a typed value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// The raw cell was empty or a missing marker.
    Absent,
    /// The raw cell held a value outside the declared levels or range.
    Unmapped,
    /// Too few items present to compute a composite score.
    InsufficientItems,
}

/// A recoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// A categorical value. The raw code is kept so scores and cross-wave
    /// comparisons work on codes, never on label text.
    Label { code: i64, label: String },
    Number(f64),
    Missing(MissingReason),
}

impl TypedValue {
    pub fn label(code: i64, label: impl Into<String>) -> Self {
        TypedValue::Label {
            code,
            label: label.into(),
        }
    }

    /// Numeric interpretation: the code for labels, the value for numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Label { code, .. } => Some(*code as f64),
            TypedValue::Number(n) => Some(*n),
            TypedValue::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, TypedValue::Missing(_))
    }

    /// Text written to the recoded dataset; missing values are empty.
    pub fn display_value(&self) -> String {
        match self {
            TypedValue::Label { label, .. } => label.clone(),
            TypedValue::Number(n) => n.to_string(),
            TypedValue::Missing(_) => String::new(),
        }
    }
}

/// One participant after recoding.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    pub id: String,
    /// Derived variable name -> value, in codebook order.
    pub values: IndexMap<String, TypedValue>,
}

impl TypedRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.values.get(name)
    }

    /// Numeric value of a derived variable; absent or missing reads as `None`.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(TypedValue::as_number)
    }
}

/// Where a typed column came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ColumnOrigin {
    /// Recoded from one raw column.
    Recoded { raw_name: String, kind: VariableKind },
    /// Mean of several item columns.
    Composite { items: Vec<String> },
}

/// Descriptor of a column in a [`TypedTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedColumn {
    pub name: String,
    #[serde(flatten)]
    pub origin: ColumnOrigin,
}

impl TypedColumn {
    /// Whether values in this column are labels.
    pub fn is_categorical(&self) -> bool {
        match &self.origin {
            ColumnOrigin::Recoded { kind, .. } => kind.is_categorical(),
            ColumnOrigin::Composite { .. } => false,
        }
    }

    /// Raw column this one replaces or derives from, if any.
    pub fn raw_name(&self) -> Option<&str> {
        match &self.origin {
            ColumnOrigin::Recoded { raw_name, .. } => Some(raw_name),
            ColumnOrigin::Composite { .. } => None,
        }
    }
}

/// Result of recoding a whole table. Rows keep the order of the input.
#[derive(Debug, Clone)]
pub struct TypedTable {
    pub records: Vec<TypedRecord>,
    pub columns: Vec<TypedColumn>,
    pub diagnostics: RecodeDiagnostics,
}

impl TypedTable {
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Values of one column, row by row.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Option<&'a TypedValue>> {
        self.records.iter().map(move |r| r.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_interpretation_uses_codes() {
        assert_eq!(TypedValue::label(4, "Mee eens").as_number(), Some(4.0));
        assert_eq!(TypedValue::Number(51.0).as_number(), Some(51.0));
        assert_eq!(TypedValue::Missing(MissingReason::Unmapped).as_number(), None);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(TypedValue::label(2, "Vrouw").display_value(), "Vrouw");
        assert_eq!(TypedValue::Number(40.0).display_value(), "40");
        assert_eq!(TypedValue::Number(3.5).display_value(), "3.5");
        assert_eq!(TypedValue::Missing(MissingReason::Absent).display_value(), "");
    }
}
