//! Error types for the Grounded answering service.
//!
//! This module defines a unified error enum covering every collaborator the
//! pipeline talks to (chat model, embedding model, hybrid-search store,
//! rate-limit counter) plus configuration and serialization failures.

use thiserror::Error;

/// Unified error type for the Grounded workspace.
///
/// All fallible functions return `Result<T, AppError>`.
/// Nothing panics on a bad response: errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat-completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Hybrid-search store errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Rate-limit counter errors (transport, not denial)
    #[error("Rate limit store error: {0}")]
    RateLimit(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// The message without the category prefix.
    ///
    /// Used where the error text is handed back to a caller verbatim.
    pub fn message(&self) -> String {
        match self {
            AppError::Config(msg)
            | AppError::Llm(msg)
            | AppError::Embedding(msg)
            | AppError::Retrieval(msg)
            | AppError::RateLimit(msg)
            | AppError::Prompt(msg)
            | AppError::Serialization(msg)
            | AppError::Other(msg) => msg.clone(),
            AppError::Io(err) => err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
