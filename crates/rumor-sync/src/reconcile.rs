//! Reconciliation engine.
//!
//! Builds the local summary vector and, given a peer's summary, derives
//! exactly the records that peer is missing.

use std::sync::Arc;

use rumor_core::{Record, StreamId, SummaryVector};
use rumor_store::Store;

use crate::error::Result;

/// Records from `streams` that a node advertising `remote` does not hold.
///
/// For each local stream:
/// - absent from `remote`: every record is missing
/// - `remote[s] = n`: every record with `sequence > n` is missing
///
/// Streams only the remote knows are never examined. Records keep their
/// per-stream order; streams appear in input order.
pub fn missing_records(
    streams: Vec<(StreamId, Vec<Record>)>,
    remote: &SummaryVector,
) -> Vec<Record> {
    let mut delta = Vec::new();

    for (stream_id, records) in streams {
        match remote.get(&stream_id) {
            None => delta.extend(records),
            Some(high) => delta.extend(records.into_iter().filter(|r| r.sequence > high)),
        }
    }

    delta
}

/// Computes summaries and deltas against a store.
pub struct ReconciliationEngine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for ReconciliationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> ReconciliationEngine<S> {
    /// Create an engine over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Highest locally held sequence for every known stream.
    ///
    /// Read-only. Cost grows with stored records, which is acceptable at
    /// anti-entropy frequency.
    pub async fn build_local_summary(&self) -> Result<SummaryVector> {
        Ok(self.store.stream_heads().await?)
    }

    /// Every local record the holder of `remote_want` is missing.
    pub async fn compute_delta(&self, remote_want: &SummaryVector) -> Result<Vec<Record>> {
        let streams = self.store.list_streams().await?;
        let delta = missing_records(streams, remote_want);

        tracing::debug!(
            remote_streams = remote_want.len(),
            missing = delta.len(),
            "computed delta"
        );

        Ok(delta)
    }
}
