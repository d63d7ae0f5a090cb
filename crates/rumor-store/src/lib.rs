//! # Rumor Store
//!
//! Storage abstraction for Rumor. Provides a trait-based interface for
//! record and peer persistence with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The reconciliation engine and peer registry only ever talk to the
//! [`Store`] trait. The primary implementation is [`SqliteStore`], with
//! [`MemoryStore`] for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rumor_core::Record;
//! use rumor_store::{MergeResult, SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("rumor.db").unwrap();
//!
//!     let record = Record::new("news", 0, "alice", "hello");
//!     let result = store.merge_record(&record).await.unwrap();
//!     assert_eq!(result, MergeResult::Inserted);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent merge**: merging a record whose `(stream_id, sequence)` is
//!   already stored returns `Duplicate` and changes nothing
//! - **Append-only**: records are never updated or deleted
//! - **Conditional peer insert**: concurrent `insert_peer_if_absent` calls for
//!   the same endpoint create exactly one peer
//! - **Last-writer-wins wants**: `upsert_peer` overwrites the stored want

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{MergeResult, Store};
