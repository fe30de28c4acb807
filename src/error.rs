//! Error types for paraforge operations.
//!
//! Defines error types for the major subsystems:
//! - Source dataset loading and indexing
//! - LLM API interactions
//! - Artifact merging and validation

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or indexing source datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Column '{column}' not found in '{path}'. Available columns: {available:?}")]
    MissingColumn {
        path: PathBuf,
        column: String,
        available: Vec<String>,
    },

    #[error("No usable rows in '{0}'")]
    EmptyDataset(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key: PARAFORGE_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Generation for tag '{tag}' exhausted {attempts} attempts (last: {reason})")]
    AttemptsExhausted {
        tag: String,
        attempts: u32,
        reason: String,
    },

    #[error("Response contained {got} usable lines, expected at least {expected}")]
    ShortResponse { got: usize, expected: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LlmError {
    /// Whether this error is worth retrying within a single generation call.
    ///
    /// Transport faults, server-side errors and short responses are
    /// recoverable; authentication and client-side errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::RequestFailed(_) | LlmError::RateLimited(_) => true,
            LlmError::ShortResponse { .. } | LlmError::ParseError(_) => true,
            LlmError::ApiError { code, .. } => *code >= 500 || *code == 429 || *code == 408,
            _ => false,
        }
    }
}

/// Errors that can occur while merging per-tag artifacts.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No artifact files found in '{0}'")]
    NoArtifacts(PathBuf),

    #[error("Failed to read artifact '{path}': {source}")]
    ArtifactReadFailed { path: PathBuf, source: csv::Error },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_transient_classification() {
        assert!(LlmError::RequestFailed("timeout".into()).is_transient());
        assert!(LlmError::RateLimited("slow down".into()).is_transient());
        assert!(LlmError::ShortResponse {
            got: 199,
            expected: 200
        }
        .is_transient());
        assert!(LlmError::ApiError {
            code: 503,
            message: "unavailable".into()
        }
        .is_transient());

        assert!(!LlmError::MissingApiKey.is_transient());
        assert!(!LlmError::ApiError {
            code: 401,
            message: "bad key".into()
        }
        .is_transient());
    }

    #[test]
    fn test_dataset_error_display() {
        let err = DatasetError::MissingColumn {
            path: PathBuf::from("input.csv"),
            column: "query".to_string(),
            available: vec!["question".to_string(), "tag".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("query"));
        assert!(msg.contains("input.csv"));
    }
}
