//! Error types for the ledger.

use thiserror::Error;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by hierarchy stores.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend failure (unavailable, corrupt, poisoned lock)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record with the same key already exists
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// A counter would leave its representable range
    #[error("Overflow: {0}")]
    Overflow(String),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
