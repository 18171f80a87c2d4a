/*!
 * Error types for the promolint application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when calling the semantic analyzer
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Error when making an API request fails
    #[error("Analyzer request failed: {0}")]
    RequestFailed(String),

    /// Error when the analyzer reply cannot be parsed into the expected shape
    #[error("Malformed analyzer response: {0}")]
    MalformedResponse(String),

    /// Error returned by the analyzer service itself
    #[error("Analyzer responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the service
        message: String,
    },

    /// The call exceeded its deadline
    #[error("Analyzer call timed out after {0}s")]
    Timeout(u64),

    /// All retry attempts were exhausted
    #[error("Analyzer retries exhausted: {0}")]
    RetriesExhausted(String),
}

impl AnalyzerError {
    /// Whether another attempt may succeed (server/transport trouble)
    /// as opposed to a caller mistake that will fail identically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout(_) | Self::MalformedResponse(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::RetriesExhausted(_) => false,
        }
    }
}

/// Errors that can occur when loading rule files or reference datasets
#[derive(Error, Debug)]
pub enum ReferenceError {
    /// A rule file or dataset file is absent
    #[error("Reference data missing: {0}")]
    Missing(String),

    /// A file exists but cannot be parsed
    #[error("Failed to parse reference data {path}: {message}")]
    Parse {
        /// Path of the offending file
        path: String,
        /// Parser error message
        message: String,
    },
}

/// Errors that can occur while evaluating a document
#[derive(Error, Debug)]
pub enum EngineError {
    /// The document fails minimal shape validation - fatal, aborts the run
    #[error("Structural error: {0}")]
    Structural(String),

    /// Error from the semantic analyzer
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Error from reference data loading
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// A check module failed in a way it could not convert into advisories
    #[error("Check module '{module}' failed: {message}")]
    ModuleFailed {
        /// Module name
        module: String,
        /// Failure description
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the semantic analyzer
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Error from reference data
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// Error from the evaluation engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
