//! Error types for the node.

use rumor_core::{StreamId, ValidationError};
use rumor_store::StoreError;
use rumor_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Remote records kept taking the next position while publishing.
    #[error("could not claim a sequence on stream {0}")]
    PublishContended(StreamId),

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),

    /// A background task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
