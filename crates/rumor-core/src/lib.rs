//! # Rumor Core
//!
//! Pure primitives for the Rumor gossip protocol: records, streams, summary
//! vectors, and peers.
//!
//! This crate contains no I/O, no storage, no networking. It is the shared
//! vocabulary of the other Rumor crates.
//!
//! ## Key Types
//!
//! - [`Record`] - An immutable unit of gossip content
//! - [`RecordKey`] - Deduplication key derived from `(stream_id, sequence)`
//! - [`StreamId`] - Identifier for an append-only family of records
//! - [`SummaryVector`] - Per-stream high-water marks ("want" vector)
//! - [`Peer`] - A known remote node and its last observed want
//!
//! ## Validation
//!
//! Anything arriving from the network is checked with the functions in
//! [`validation`] before it reaches the reconciliation engine.

pub mod error;
pub mod peer;
pub mod record;
pub mod summary;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use peer::{ObservedWant, Peer};
pub use record::Record;
pub use summary::SummaryVector;
pub use types::{Endpoint, RecordKey, StreamId};
pub use validation::{validate_endpoint, validate_originator, validate_record, validate_want};

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
