//! Error types for rust_degsea

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum DegseaError {
    /// An external capability (statistics backend, annotation source) could not be acquired
    #[error("Missing dependency '{capability}': {reason}")]
    MissingDependency { capability: String, reason: String },

    /// Sample identifiers do not line up between the count matrix and the class table
    #[error("Data mismatch: {reason}")]
    DataMismatch { reason: String },

    /// An output file could not be created or written
    #[error("Cannot write '{}': {source}", path.display())]
    FormatWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid class table: {reason}")]
    InvalidClassTable { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid contrast specification: {reason}")]
    InvalidContrast { reason: String },

    #[error("Invalid design matrix: {reason}")]
    InvalidDesignMatrix { reason: String },

    #[error("Numerical instability in {operation}: {details}")]
    NumericalInstability { operation: String, details: String },

    #[error("Plot rendering failed: {reason}")]
    PlotError { reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DegseaError {
    /// Wrap an I/O failure on an output path
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DegseaError::FormatWrite {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DegseaError>;
