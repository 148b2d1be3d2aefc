//! Common error types for Smeta

use thiserror::Error;

/// Common result type for Smeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the consensus engine and the brain service
#[derive(Error, Debug)]
pub enum Error {
    /// Missing required field or invalid price input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Price index (or positional item index) outside the current sequence
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Referenced item or record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (serialization, corrupted stored data)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::IndexOutOfRange { .. } => "IndexOutOfRange",
            Error::NotFound(_) => "NotFound",
            #[cfg(feature = "sqlx")]
            Error::Database(_) => "DatabaseError",
            Error::Io(_) => "IoError",
            Error::Config(_) => "ConfigError",
            Error::Internal(_) => "InternalError",
        }
    }
}
