//! Error handling for the cohort pipeline.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the cohort pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error writing Parquet output
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error (de)serializing JSON artifacts or configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting records to Arrow through serde
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A table does not satisfy the declared schema
    #[error("Schema error in {table}: {message}")]
    Schema {
        /// Table label, e.g. `DEMO_F`
        table: String,
        /// What was wrong
        message: String,
    },

    /// No cycle could be loaded, so there is nothing to analyse
    #[error("No cycles loaded from {}: every configured cycle was skipped", .data_dir.display())]
    NoCyclesLoaded {
        /// Directory that was searched
        data_dir: PathBuf,
    },

    /// The study configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Build a schema error for a named table
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            message: message.into(),
        }
    }
}

impl From<serde_arrow::Error> for PipelineError {
    fn from(error: serde_arrow::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
