//! Declarative codebook: per raw variable, its measurement level and recoding rule.
//!
//! A [`Codebook`] is built once, validated, and then only read. Likert item
//! blocks are declared as a single [`ItemTemplate`] and expanded to one entry
//! per item when the codebook is constructed, so lookups always see the flat
//! list of [`CodebookEntry`] values.
//!
//! The codebook round-trips through JSON in its declared (unexpanded) form.

mod corona;
mod entry;
mod name;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WelzijnError};
use crate::scoring::ScaleDefinition;

pub use entry::{
    CodebookEntry, ItemTemplate, Level, RatioRule, RatioTransform, VariableKind, levels,
};
pub use name::VariableName;

/// One declaration in a codebook file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariableSpec {
    /// A single raw variable.
    Variable(CodebookEntry),
    /// A block of Likert items sharing one level map.
    Items(ItemTemplate),
}

impl From<CodebookEntry> for VariableSpec {
    fn from(entry: CodebookEntry) -> Self {
        VariableSpec::Variable(entry)
    }
}

impl From<ItemTemplate> for VariableSpec {
    fn from(template: ItemTemplate) -> Self {
        VariableSpec::Items(template)
    }
}

/// Serialized form of a codebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebookDocument {
    pub name: String,
    pub variables: Vec<VariableSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scales: Vec<ScaleDefinition>,
}

/// Validated, expanded codebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CodebookDocument", into = "CodebookDocument")]
pub struct Codebook {
    document: CodebookDocument,
    entries: Vec<CodebookEntry>,
    /// raw name -> position in `entries`
    by_raw: IndexMap<String, usize>,
}

impl Codebook {
    /// Build and validate a codebook.
    pub fn new(
        name: impl Into<String>,
        variables: Vec<VariableSpec>,
        scales: Vec<ScaleDefinition>,
    ) -> Result<Self> {
        Self::try_from(CodebookDocument {
            name: name.into(),
            variables,
            scales,
        })
    }

    /// The codebook for the Corona & Welzijn study, waves 1 and 2.
    pub fn corona_welzijn() -> Self {
        corona::codebook()
    }

    /// Load a codebook from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| WelzijnError::io(path, e))?;
        let document: CodebookDocument = serde_json::from_reader(BufReader::new(file))?;
        let codebook = Codebook::try_from(document)?;
        tracing::debug!(
            file = %path.display(),
            entries = codebook.len(),
            scales = codebook.scales().len(),
            "Loaded codebook"
        );
        Ok(codebook)
    }

    /// Save the codebook as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| WelzijnError::io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| WelzijnError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.document)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    /// All entries with item templates expanded, in declaration order.
    pub fn entries(&self) -> &[CodebookEntry] {
        &self.entries
    }

    /// Declared composite scales.
    pub fn scales(&self) -> &[ScaleDefinition] {
        &self.document.scales
    }

    /// The declarations as written, templates unexpanded.
    pub fn variables(&self) -> &[VariableSpec] {
        &self.document.variables
    }

    /// Look up the entry for a raw column.
    pub fn entry(&self, raw_name: &str) -> Option<&CodebookEntry> {
        self.by_raw.get(raw_name).map(|&i| &self.entries[i])
    }

    /// Reverse-map a label of `raw_name` back to its raw code.
    pub fn code_for(&self, raw_name: &str, label: &str) -> Option<i64> {
        self.entry(raw_name)?.code_for(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<CodebookDocument> for Codebook {
    type Error = WelzijnError;

    fn try_from(document: CodebookDocument) -> Result<Self> {
        let mut entries = Vec::new();
        for spec in &document.variables {
            match spec {
                VariableSpec::Variable(entry) => {
                    entry.validate()?;
                    entries.push(entry.clone());
                }
                VariableSpec::Items(template) => {
                    template.validate()?;
                    for entry in template.expand() {
                        entry.validate()?;
                        entries.push(entry);
                    }
                }
            }
        }

        let mut by_raw = IndexMap::new();
        let mut derived = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            if by_raw.insert(entry.raw_name.clone(), i).is_some() {
                return Err(WelzijnError::Codebook(format!(
                    "raw variable '{}' is declared more than once",
                    entry.raw_name
                )));
            }
            if !derived.insert(entry.derived_name.as_str()) {
                return Err(WelzijnError::Codebook(format!(
                    "derived variable '{}' is produced more than once",
                    entry.derived_name
                )));
            }
        }

        for scale in &document.scales {
            scale.validate()?;
            if derived.contains(scale.name.as_str()) {
                return Err(WelzijnError::Codebook(format!(
                    "scale '{}' collides with a recoded variable",
                    scale.name
                )));
            }
            for item in &scale.items {
                if !derived.contains(item.as_str()) {
                    return Err(WelzijnError::Codebook(format!(
                        "scale '{}' refers to undeclared item '{}'",
                        scale.name, item
                    )));
                }
            }
        }

        Ok(Self {
            document,
            entries,
            by_raw,
        })
    }
}

impl From<Codebook> for CodebookDocument {
    fn from(codebook: Codebook) -> Self {
        codebook.document
    }
}
