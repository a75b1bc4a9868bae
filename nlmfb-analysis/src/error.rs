//! Error types for nlmfb-analysis

use thiserror::Error;

use crate::completion_client::CompletionError;

/// Analysis error type
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Completion API failed
    #[error("Completion API error: {0}")]
    Completion(#[from] CompletionError),

    /// The API answered without the log-probabilities we asked for
    #[error("Unexpected completion response: {0}")]
    UnexpectedResponse(String),

    /// Input table lacks a column or holds an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tabular file error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
