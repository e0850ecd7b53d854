//! Error types for the welzijn library.
//!
//! Only boundary failures live here (unreadable input, malformed codebook or
//! configuration). Data-quality problems found while running the pipeline are
//! collected as [`crate::diagnostics::Issue`]s instead and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for welzijn operations.
#[derive(Debug, Error)]
pub enum WelzijnError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to process.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// The codebook is malformed (duplicate codes, empty item range, ...).
    #[error("Codebook error: {0}")]
    Codebook(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WelzijnError {
    /// Wrap an IO error together with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WelzijnError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for welzijn operations.
pub type Result<T> = std::result::Result<T, WelzijnError>;
