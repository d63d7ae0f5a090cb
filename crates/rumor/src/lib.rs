//! # Rumor
//!
//! Epidemic replication of append-only streams. Nodes periodically exchange
//! summary vectors and push each other exactly the records the other lacks.
//!
//! ## Overview
//!
//! - **Records**: `(stream, sequence, originator, payload)`, immutable once merged
//! - **Streams**: independent append-only logs, sequences starting at 0
//! - **Wants**: per-stream high-water marks a node advertises to its peers
//! - **Anti-entropy**: every interval, send your want to every known peer
//!
//! Convergence is eventual and loose. Nothing is retried: a record lost in
//! transit is found again the next time its owner sees the peer's want.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rumor::{http, HttpTransport, Node, NodeConfig};
//! use rumor::store::SqliteStore;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = NodeConfig::default();
//!     let store = SqliteStore::open("rumor.db")?;
//!     let transport = HttpTransport::from_config(&config)?;
//!
//!     let node = Arc::new(Node::start(config, store, transport).await?);
//!     node.publish("news", "hello").await?;
//!
//!     let app = http::router(Arc::clone(&node));
//!     let listener = tokio::net::TcpListener::bind(&node.config().listen).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `rumor::core` - data model and validation
//! - `rumor::store` - storage trait, memory and SQLite backends
//! - `rumor::sync` - the gossip protocol

pub mod config;
pub mod error;
pub mod http;
pub mod node;

// Re-export component crates
pub use rumor_core as core;
pub use rumor_store as store;
pub use rumor_sync as sync;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use http::HttpTransport;
pub use node::Node;

pub use rumor_core::{Endpoint, Record, StreamId, SummaryVector};
