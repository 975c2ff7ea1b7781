//! Error types for the data-loader crate.

use thiserror::Error;

/// Errors that can occur while loading and parsing the purchase-order dataset
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open dataset file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV reader itself failed (bad quoting, truncated file, ...)
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A row couldn't be interpreted
    ///
    /// This variant stores context about where the error occurred
    #[error("Parse error at row {row} in {file}: {reason}")]
    ParseError {
        file: String,
        row: usize,
        reason: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
