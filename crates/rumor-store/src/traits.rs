//! Store trait: the abstract interface for record and peer persistence.
//!
//! This trait keeps the protocol storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use rumor_core::{Endpoint, ObservedWant, Peer, Record, StreamId, SummaryVector};

use crate::error::Result;

/// Result of merging a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// Record was stored.
    Inserted,
    /// A record at this `(stream_id, sequence)` already exists (not an error).
    Duplicate,
}

/// The Store trait: async interface for durable gossip state.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// Every write is atomic per document: concurrent callers never observe a
/// half-applied merge or upsert.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Idempotently insert a record into its stream.
    ///
    /// # Returns
    /// - `Inserted` if the position was empty.
    /// - `Duplicate` if a record at the same `(stream_id, sequence)` exists;
    ///   the stored record is left untouched.
    async fn merge_record(&self, record: &Record) -> Result<MergeResult>;

    /// All records of one stream, ordered by sequence.
    async fn get_stream(&self, stream_id: &StreamId) -> Result<Vec<Record>>;

    /// Every stream with its records ordered by sequence.
    ///
    /// Streams with no records never appear.
    async fn list_streams(&self) -> Result<Vec<(StreamId, Vec<Record>)>>;

    /// Highest stored sequence per stream.
    ///
    /// Must equal the maximum over [`Store::list_streams`].
    async fn stream_heads(&self) -> Result<SummaryVector>;

    // ─────────────────────────────────────────────────────────────────────────
    // Peer Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a peer with an empty want unless one already exists.
    ///
    /// Returns `true` if this call created the peer. Under concurrent calls
    /// for the same endpoint exactly one caller sees `true`.
    async fn insert_peer_if_absent(&self, endpoint: &Endpoint) -> Result<bool>;

    /// Create-if-absent and unconditionally overwrite the peer's last
    /// reported want.
    async fn upsert_peer(&self, endpoint: &Endpoint, want: &ObservedWant) -> Result<()>;

    /// Look up a peer by endpoint.
    async fn find_peer(&self, endpoint: &Endpoint) -> Result<Option<Peer>>;

    /// All known peers, in no particular order.
    async fn list_peers(&self) -> Result<Vec<Peer>>;
}
