//! Store errors.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// Value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored row could not be turned back into a value.
    #[error("corrupt row: {0}")]
    InvalidData(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    /// The store cannot be reached (poisoned lock, failed worker thread).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
