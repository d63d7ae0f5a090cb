//! Error types for the sync module.

use thiserror::Error;

use rumor_core::{Endpoint, ValidationError};

/// Errors that can occur during gossip operations.
///
/// Transport failures are logged and never retried; the next anti-entropy
/// round rediscovers whatever they lost. Store failures abort the current
/// operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Inbound message failed boundary validation.
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ValidationError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Destination is not reachable.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(Endpoint),

    /// Destination answered with a non-success status.
    #[error("peer {endpoint} rejected message with status {status}")]
    PeerRejected { endpoint: Endpoint, status: u16 },

    /// Network call exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] rumor_store::StoreError),

    /// The delivery pipeline has shut down.
    #[error("delivery pipeline closed")]
    PipelineClosed,

    /// The delivery queue is full (only from non-blocking submission).
    #[error("delivery pipeline full")]
    PipelineFull,
}

impl SyncError {
    /// Whether this is a network-side failure (as opposed to local state).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::Transport(_)
                | SyncError::PeerUnreachable(_)
                | SyncError::PeerRejected { .. }
                | SyncError::Timeout(_)
        )
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
