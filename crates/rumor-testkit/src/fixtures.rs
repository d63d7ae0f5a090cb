//! Test fixtures and helpers.
//!
//! Common setup code for multi-node tests.

use std::sync::Arc;
use std::time::Duration;

use rumor::{Node, NodeConfig};
use rumor_core::{Endpoint, Record};
use rumor_store::{MemoryStore, Store};
use rumor_sync::{verify_convergence, MemoryNetwork, MemoryTransport, RoundReport};

/// A node on the in-memory network.
pub type TestNode = Node<MemoryStore, MemoryTransport>;

/// Long enough that the background scheduler never fires during a test.
pub const MANUAL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Endpoint used for the node called `name`.
pub fn endpoint(name: &str) -> Endpoint {
    Endpoint::new(format!("mem://{}", name))
}

/// Records `0..count` of a stream, with predictable payloads.
pub fn stream_records(stream: &str, count: u64) -> Vec<Record> {
    (0..count)
        .map(|seq| Record::new(stream, seq, "fixture", format!("{}:{}", stream, seq)))
        .collect()
}

/// Nodes sharing one in-memory network, driven round by round.
pub struct TestCluster {
    pub network: Arc<MemoryNetwork>,
    pub nodes: Vec<Arc<TestNode>>,
}

impl TestCluster {
    /// Start `size` nodes named `node-0`, `node-1`, ... that know nobody.
    pub async fn new(size: usize) -> rumor::Result<Self> {
        let network = MemoryNetwork::new();
        let mut nodes = Vec::with_capacity(size);

        for i in 0..size {
            let name = format!("node-{}", i);
            let config = NodeConfig {
                endpoint: endpoint(&name),
                originator: name.clone(),
                anti_entropy_interval: MANUAL_INTERVAL,
                ..Default::default()
            };
            let node = Node::start(config, MemoryStore::new(), network.transport(endpoint(&name))).await?;
            let node = Arc::new(node);
            network.register(endpoint(&name), node.handler()).await;
            nodes.push(node);
        }

        Ok(Self { network, nodes })
    }

    /// Start `size` nodes where every node knows every other.
    pub async fn fully_connected(size: usize) -> rumor::Result<Self> {
        let cluster = Self::new(size).await?;
        for node in &cluster.nodes {
            for other in &cluster.nodes {
                if !Arc::ptr_eq(node, other) {
                    node.add_peer(other.endpoint()).await?;
                }
            }
        }
        Ok(cluster)
    }

    /// Start `size` nodes where node `i` knows only node `i + 1`.
    pub async fn chain(size: usize) -> rumor::Result<Self> {
        let cluster = Self::new(size).await?;
        for pair in cluster.nodes.windows(2) {
            pair[0].add_peer(pair[1].endpoint()).await?;
        }
        Ok(cluster)
    }

    pub fn node(&self, index: usize) -> &Arc<TestNode> {
        &self.nodes[index]
    }

    /// Merge records straight into a node's store, bypassing gossip.
    pub async fn seed(&self, index: usize, records: &[Record]) -> rumor::Result<()> {
        for record in records {
            self.nodes[index].store().merge_record(record).await?;
        }
        Ok(())
    }

    /// Every node runs one round, then all pushes are allowed to finish.
    pub async fn round(&self) -> rumor::Result<Vec<RoundReport>> {
        let mut reports = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            reports.push(node.run_round().await?);
        }
        self.settle().await;
        Ok(reports)
    }

    /// Wait until no node has deliveries queued.
    pub async fn settle(&self) {
        for node in &self.nodes {
            node.wait_idle().await;
        }
    }

    /// Whether every node holds the same records as node 0.
    pub async fn is_converged(&self) -> rumor::Result<bool> {
        let Some(first) = self.nodes.first() else {
            return Ok(true);
        };
        for other in &self.nodes[1..] {
            let result = verify_convergence(first.store().as_ref(), other.store().as_ref()).await?;
            if !result.is_converged() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run rounds until converged. Returns the number of rounds used, or
    /// `None` if `max_rounds` was not enough.
    pub async fn converge(&self, max_rounds: usize) -> rumor::Result<Option<usize>> {
        for round in 1..=max_rounds {
            self.round().await?;
            if self.is_converged().await? {
                return Ok(Some(round));
            }
        }
        Ok(None)
    }

    /// Cut a node off from the network, or reconnect it.
    pub async fn partition(&self, index: usize, partitioned: bool) {
        self.network
            .set_partitioned(self.nodes[index].endpoint(), partitioned)
            .await;
    }

    /// Total records held by a node.
    pub fn record_count(&self, index: usize) -> usize {
        self.nodes[index].store().record_count()
    }

    /// Stop every node.
    pub async fn shutdown(&self) -> rumor::Result<()> {
        for node in &self.nodes {
            node.shutdown().await?;
        }
        Ok(())
    }
}
