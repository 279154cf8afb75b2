//! Common error types for FPT

use thiserror::Error;

/// Common result type for FPT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across FPT components
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A backing store cannot be reached or is not configured
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A bounded remote call did not complete in time
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// CSV text could not be turned into a usable table
    #[error("CSV error: {0}")]
    Csv(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures that mean "try the next source", as opposed to
    /// a source that answered with something unusable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_) | Error::Timeout(_))
    }
}
