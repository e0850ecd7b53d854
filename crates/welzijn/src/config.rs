//! Run configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consistency::StabilityThresholds;
use crate::error::{Result, WelzijnError};
use crate::input::ParserConfig;

/// Configuration for a pipeline run. Every field has a default, so a JSON
/// config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parser configuration.
    pub parser: ParserConfig,
    /// Participant id column.
    pub id_column: String,
    /// Wave 1 participation indicator.
    pub w1_column: String,
    /// Wave 2 participation indicator.
    pub w2_column: String,
    pub scoring: ScoringConfig,
    pub stability: StabilityThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            id_column: "Nummer".to_string(),
            w1_column: "W1".to_string(),
            w2_column: "W2".to_string(),
            scoring: ScoringConfig::default(),
            stability: StabilityThresholds::default(),
        }
    }
}

/// Composite scoring options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum answered items for a composite score, for every scale that
    /// does not set its own. `None` means at least half of the items.
    pub min_items_present: Option<usize>,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| WelzijnError::io(path, e))?;
        let config: PipelineConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            WelzijnError::Config(format!("Failed to parse config '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_column.trim().is_empty() {
            return Err(WelzijnError::Config("id_column must not be empty".to_string()));
        }
        if self.w1_column == self.w2_column {
            return Err(WelzijnError::Config(format!(
                "wave indicators must differ, both are '{}'",
                self.w1_column
            )));
        }
        if self.scoring.min_items_present == Some(0) {
            return Err(WelzijnError::Config(
                "scoring.min_items_present must be at least 1".to_string(),
            ));
        }
        let t = &self.stability;
        if t.unstable_below > t.stable || t.stable > 100.0 || t.unstable_below < 0.0 {
            return Err(WelzijnError::Config(format!(
                "stability thresholds must satisfy 0 <= unstable_below ({}) <= stable ({}) <= 100",
                t.unstable_below, t.stable
            )));
        }
        Ok(())
    }
}
