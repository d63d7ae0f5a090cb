//! Inbound message handling.
//!
//! A `Want` registers the sender, overwrites its last reported want and
//! queues the delta for delivery. A `Record` is merged into the store and
//! goes no further: nodes pull, they never relay.

use std::sync::Arc;

use async_trait::async_trait;

use rumor_store::{MergeResult, Store};

use crate::error::Result;
use crate::messages::{GossipMessage, RecordMessage, WantMessage};
use crate::pipeline::{DeliveryBatch, DeliveryHandle};
use crate::reconcile::ReconciliationEngine;
use crate::registry::PeerRegistry;
use crate::transport::InboundHandler;

/// What a `Want` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantOutcome {
    /// This many records were queued for the sender.
    Enqueued(usize),
    /// The sender already has everything we hold.
    UpToDate,
}

/// Processes messages arriving at a node.
pub struct ProtocolHandler<S: Store> {
    engine: ReconciliationEngine<S>,
    registry: PeerRegistry<S>,
    store: Arc<S>,
    pipeline: DeliveryHandle,
}

impl<S: Store> Clone for ProtocolHandler<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            registry: self.registry.clone(),
            store: Arc::clone(&self.store),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<S: Store> ProtocolHandler<S> {
    pub fn new(store: Arc<S>, pipeline: DeliveryHandle) -> Self {
        Self {
            engine: ReconciliationEngine::new(Arc::clone(&store)),
            registry: PeerRegistry::new(Arc::clone(&store)),
            store,
            pipeline,
        }
    }

    /// Handle a peer's summary vector.
    ///
    /// Returns once the delta is queued; delivery happens on the pipeline.
    pub async fn handle_want(&self, msg: WantMessage) -> Result<WantOutcome> {
        msg.validate()?;

        let peer = msg.reply_endpoint;
        self.registry.ensure_peer(&peer).await?;
        self.registry.record_want(&peer, msg.want.clone()).await?;

        let delta = self.engine.compute_delta(&msg.want).await?;
        if delta.is_empty() {
            tracing::debug!(peer = %peer, "peer is up to date");
            return Ok(WantOutcome::UpToDate);
        }

        let count = delta.len();
        self.pipeline
            .submit(DeliveryBatch::new(peer.clone(), delta))
            .await?;
        tracing::debug!(peer = %peer, records = count, "queued delta");
        Ok(WantOutcome::Enqueued(count))
    }

    /// Merge a pushed record. Duplicates are accepted silently.
    pub async fn handle_record(&self, msg: RecordMessage) -> Result<MergeResult> {
        msg.validate()?;
        let record = msg.to_record();

        let result = self.store.merge_record(&record).await?;
        match result {
            MergeResult::Inserted => {
                tracing::debug!(record = %record.label(), from = %msg.reply_endpoint, "merged record")
            }
            MergeResult::Duplicate => {
                tracing::trace!(record = %record.label(), "duplicate record ignored")
            }
        }
        Ok(result)
    }

    /// Dispatch any inbound message.
    pub async fn handle(&self, message: GossipMessage) -> Result<()> {
        match message {
            GossipMessage::Want(msg) => self.handle_want(msg).await.map(|_| ()),
            GossipMessage::Record(msg) => self.handle_record(msg).await.map(|_| ()),
        }
    }
}

#[async_trait]
impl<S: Store + 'static> InboundHandler for ProtocolHandler<S> {
    async fn handle(&self, message: GossipMessage) -> Result<()> {
        ProtocolHandler::handle(self, message).await
    }
}
