//! CLI command implementations.

pub mod codebook;
pub mod recode;
pub mod report;

use std::path::Path;

use welzijn::{Codebook, Pipeline, PipelineConfig};

/// Build a pipeline from optional codebook and config files.
pub(crate) fn build_pipeline(
    codebook: Option<&Path>,
    config: Option<&Path>,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut pipeline = Pipeline::with_config(config);
    if let Some(path) = codebook {
        pipeline = pipeline.with_codebook(Codebook::load(path)?);
    }
    Ok(pipeline)
}

pub(crate) fn ensure_exists(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }
    Ok(())
}
