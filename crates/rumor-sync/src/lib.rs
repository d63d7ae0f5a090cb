//! # Rumor Sync
//!
//! Anti-entropy gossip for converging append-only streams across peers.
//!
//! ## Overview
//!
//! Each node periodically tells every known peer what it holds, as a
//! summary vector of per-stream high-water marks. A node receiving such a
//! "want" replies by pushing, one message per record, every local record
//! the summary shows the sender is missing.
//!
//! ## Key Properties
//!
//! - **Idempotent**: merging the same record twice is a no-op
//! - **Pull-only**: records are pushed only in answer to a want, never relayed
//! - **Lossy but self-healing**: failed sends are logged, not retried; the
//!   next round rediscovers the gap
//! - **Non-blocking**: inbound handlers queue deltas and return; a worker
//!   does the network I/O
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rumor_core::Endpoint;
//! use rumor_store::MemoryStore;
//! use rumor_sync::{DeliveryPipeline, MemoryNetwork, ProtocolHandler};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!     let me = Endpoint::new("mem://a");
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let (pipeline, worker) = DeliveryPipeline::new(
//!         network.transport(me.clone()),
//!         me.clone(),
//!         256,
//!         Duration::from_secs(10),
//!     );
//!     tokio::spawn(worker.run());
//!
//!     let handler = Arc::new(ProtocolHandler::new(store, pipeline));
//!     network.register(me, handler).await;
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Node A                              Node B
//!   |-------- Want {A's summary} ----->|   (every interval)
//!   |<------- Record ------------------|   (one per record A lacks)
//!   |<------- Record ------------------|
//!   |<------- Want {B's summary} ------|   (B's own round)
//!   |-------- Record ----------------->|
//! ```

pub mod convergence;
pub mod error;
pub mod handler;
pub mod messages;
pub mod pipeline;
pub mod reconcile;
pub mod registry;
pub mod scheduler;
pub mod transport;

pub use convergence::{stream_digest, verify_convergence, ConvergenceResult};
pub use error::{Result, SyncError};
pub use handler::{ProtocolHandler, WantOutcome};
pub use messages::{limits, GossipMessage, RecordMessage, WantMessage};
pub use pipeline::{
    DeliveryBatch, DeliveryHandle, DeliveryPipeline, DeliveryStats, DeliveryWorker,
    DEFAULT_QUEUE_CAPACITY,
};
pub use reconcile::{missing_records, ReconciliationEngine};
pub use registry::PeerRegistry;
pub use scheduler::{AntiEntropyScheduler, RoundReport, DEFAULT_INTERVAL};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, InboundHandler, Transport};
