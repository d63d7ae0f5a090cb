//! The Node: one gossip participant.
//!
//! A node owns a store, answers inbound gossip through its protocol
//! handler, pushes deltas through the delivery pipeline, and runs the
//! anti-entropy scheduler in the background.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use rumor_core::{validate_endpoint, validate_record, Endpoint, Peer, Record, StreamId, SummaryVector};
use rumor_store::{MergeResult, Store};
use rumor_sync::{
    AntiEntropyScheduler, DeliveryHandle, DeliveryPipeline, DeliveryStats, PeerRegistry,
    ProtocolHandler, ReconciliationEngine, RoundReport, Transport,
};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Attempts to claim the next sequence before giving up.
const PUBLISH_ATTEMPTS: usize = 8;

struct BackgroundTasks {
    worker: JoinHandle<DeliveryStats>,
    scheduler: JoinHandle<()>,
}

/// A running gossip node.
pub struct Node<S: Store, T: Transport> {
    config: NodeConfig,
    store: Arc<S>,
    handler: Arc<ProtocolHandler<S>>,
    registry: PeerRegistry<S>,
    scheduler: Arc<AntiEntropyScheduler<S, Arc<T>>>,
    pipeline: DeliveryHandle,
    publish_lock: Mutex<()>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl<S, T> Node<S, T>
where
    S: Store + 'static,
    T: Transport + 'static,
{
    /// Start a node: register seed peers, then spawn the delivery worker
    /// and the anti-entropy scheduler.
    pub async fn start(config: NodeConfig, store: S, transport: T) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let registry = PeerRegistry::new(Arc::clone(&store));

        let seeded = registry.seed(&config.seed_peers).await?;

        let (pipeline, worker) = DeliveryPipeline::new(
            Arc::clone(&transport),
            config.endpoint.clone(),
            config.queue_capacity,
            config.request_timeout,
        );
        let handler = Arc::new(ProtocolHandler::new(Arc::clone(&store), pipeline.clone()));
        let scheduler = Arc::new(AntiEntropyScheduler::new(
            ReconciliationEngine::new(Arc::clone(&store)),
            registry.clone(),
            transport,
            config.endpoint.clone(),
            config.anti_entropy_interval,
            config.request_timeout,
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let tasks = BackgroundTasks {
            worker: tokio::spawn(worker.run_until_shutdown(shutdown_rx.clone())),
            scheduler: tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx)),
        };

        tracing::info!(
            endpoint = %config.endpoint,
            originator = %config.originator,
            seeded,
            "node started"
        );

        Ok(Self {
            config,
            store,
            handler,
            registry,
            scheduler,
            pipeline,
            publish_lock: Mutex::new(()),
            shutdown,
            tasks: Mutex::new(Some(tasks)),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// This node's reply endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The inbound side, for registering with a transport or server.
    pub fn handler(&self) -> Arc<ProtocolHandler<S>> {
        Arc::clone(&self.handler)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Origination
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a locally authored record to `stream_id`.
    ///
    /// The record takes the position after the current head, or `0` for a
    /// new stream. It reaches peers through their next anti-entropy want.
    pub async fn publish(
        &self,
        stream_id: impl Into<StreamId>,
        payload: impl Into<String>,
    ) -> Result<Record> {
        let stream_id = stream_id.into();
        let payload = payload.into();
        let _guard = self.publish_lock.lock().await;

        for _ in 0..PUBLISH_ATTEMPTS {
            let heads = self.store.stream_heads().await?;
            let sequence = match heads.get(&stream_id) {
                Some(head) => head.saturating_add(1),
                None => 0,
            };

            let record = Record::new(
                stream_id.clone(),
                sequence,
                self.config.originator.clone(),
                payload.clone(),
            );
            validate_record(&record)?;

            match self.store.merge_record(&record).await? {
                MergeResult::Inserted => {
                    tracing::info!(record = %record.label(), "published record");
                    return Ok(record);
                }
                MergeResult::Duplicate => {
                    tracing::debug!(record = %record.label(), "position taken by a peer record, retrying");
                }
            }
        }

        Err(NodeError::PublishContended(stream_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Highest held sequence per stream.
    pub async fn summary(&self) -> Result<SummaryVector> {
        Ok(self.store.stream_heads().await?)
    }

    /// Records of one stream in sequence order.
    pub async fn stream(&self, stream_id: &StreamId) -> Result<Vec<Record>> {
        Ok(self.store.get_stream(stream_id).await?)
    }

    pub async fn peers(&self) -> Result<Vec<Peer>> {
        Ok(self.registry.list_peers().await?)
    }

    /// Introduce a peer out of band. Returns `true` if it was new.
    pub async fn add_peer(&self, endpoint: &Endpoint) -> Result<bool> {
        validate_endpoint(endpoint)?;
        Ok(self.registry.ensure_peer(endpoint).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gossip Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run an anti-entropy round now, outside the schedule.
    pub async fn run_round(&self) -> Result<RoundReport> {
        Ok(self.scheduler.run_round().await?)
    }

    /// Wait until every queued delivery has been attempted.
    pub async fn wait_idle(&self) {
        self.pipeline.wait_idle().await;
    }

    /// Stop the scheduler, drain the delivery queue and wait for both.
    ///
    /// Later calls return empty stats.
    pub async fn shutdown(&self) -> Result<DeliveryStats> {
        let Some(tasks) = self.tasks.lock().await.take() else {
            return Ok(DeliveryStats::default());
        };

        // Receivers may already be gone if a task ended early.
        let _ = self.shutdown.send(true);

        tasks
            .scheduler
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;
        let stats = tasks
            .worker
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?;

        tracing::info!(
            batches = stats.batches,
            sent = stats.sent,
            failed = stats.failed,
            "node stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumor_store::MemoryStore;
    use rumor_sync::{MemoryNetwork, MemoryTransport};
    use std::time::Duration;

    fn config(name: &str) -> NodeConfig {
        NodeConfig {
            endpoint: Endpoint::new(format!("mem://{}", name)),
            originator: name.into(),
            anti_entropy_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    async fn start(name: &str) -> Node<MemoryStore, MemoryTransport> {
        let network = MemoryNetwork::new();
        let transport = network.transport(Endpoint::new(format!("mem://{}", name)));
        Node::start(config(name), MemoryStore::new(), transport)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_publish_assigns_sequences_from_zero() {
        let node = start("a").await;

        let first = node.publish("s1", "hello").await.unwrap();
        let second = node.publish("s1", "world").await.unwrap();
        let other = node.publish("s2", "x").await.unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(other.sequence, 0);
        assert_eq!(first.originator, "a");

        let summary = node.summary().await.unwrap();
        assert_eq!(summary.get(&StreamId::new("s1")), Some(1));
        assert_eq!(summary.get(&StreamId::new("s2")), Some(0));

        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_continues_after_remote_head() {
        let node = start("a").await;
        node.store()
            .merge_record(&Record::new("s1", 4, "b", "remote"))
            .await
            .unwrap();

        let record = node.publish("s1", "local").await.unwrap();
        assert_eq!(record.sequence, 5);
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_rejects_oversized_payload() {
        let node = start("a").await;
        let payload = "x".repeat(rumor_core::validation::limits::MAX_PAYLOAD_LEN + 1);
        assert!(matches!(
            node.publish("s1", payload).await,
            Err(NodeError::Validation(_))
        ));
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_peers_registered_at_start() {
        let network = MemoryNetwork::new();
        let cfg = NodeConfig {
            seed_peers: vec![Endpoint::new("mem://b"), Endpoint::new("mem://c")],
            ..config("a")
        };
        let node = Node::start(cfg, MemoryStore::new(), network.transport(Endpoint::new("mem://a")))
            .await
            .unwrap();

        let mut endpoints: Vec<_> = node
            .peers()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.endpoint)
            .collect();
        endpoints.sort();
        assert_eq!(endpoints, vec![Endpoint::new("mem://b"), Endpoint::new("mem://c")]);
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let network = MemoryNetwork::new();
        let cfg = NodeConfig {
            queue_capacity: 0,
            ..config("a")
        };
        let result = Node::start(cfg, MemoryStore::new(), network.transport(Endpoint::new("mem://a"))).await;
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn test_unbounded_interval_refused_before_scheduler_starts() {
        let network = MemoryNetwork::new();
        let cfg = NodeConfig {
            anti_entropy_interval: Duration::from_secs(u64::MAX),
            ..config("a")
        };
        let result = Node::start(cfg, MemoryStore::new(), network.transport(Endpoint::new("mem://a"))).await;
        assert!(matches!(result, Err(NodeError::Config(_))));
    }

    #[tokio::test]
    async fn test_shutdown_twice() {
        let node = start("a").await;
        node.shutdown().await.unwrap();
        assert_eq!(node.shutdown().await.unwrap(), DeliveryStats::default());
    }
}
