//! Transport abstraction for the gossip protocol.
//!
//! The transport layer moves one message to one endpoint and reports
//! success or failure. Implementations may use HTTP or anything else that
//! offers request/response semantics.

use std::sync::Arc;

use async_trait::async_trait;

use rumor_core::Endpoint;

use crate::error::Result;
use crate::messages::GossipMessage;

/// Outbound side: deliver a message to a peer.
///
/// Implementations must be thread-safe (Send + Sync). `Ok` means the peer
/// accepted the message; anything else is logged by the caller and never
/// retried.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a specific endpoint.
    async fn send(&self, destination: &Endpoint, message: GossipMessage) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, destination: &Endpoint, message: GossipMessage) -> Result<()> {
        (**self).send(destination, message).await
    }
}

/// Inbound side: whatever processes messages arriving at a node.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Process one inbound message.
    async fn handle(&self, message: GossipMessage) -> Result<()>;
}

/// A simple in-memory transport for testing.
///
/// Messages are dispatched directly to the destination's registered
/// handler, which plays the role of the remote server.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    use crate::error::SyncError;

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Handler for each endpoint.
        handlers: RwLock<HashMap<Endpoint, Arc<dyn InboundHandler>>>,
        /// Endpoints currently cut off from the network.
        partitioned: RwLock<HashSet<Endpoint>>,
        /// Messages accepted by a handler.
        delivered: AtomicUsize,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Attach a handler at `endpoint`, replacing any previous one.
        pub async fn register(&self, endpoint: Endpoint, handler: Arc<dyn InboundHandler>) {
            self.handlers.write().await.insert(endpoint, handler);
        }

        /// Detach the handler at `endpoint`.
        pub async fn unregister(&self, endpoint: &Endpoint) {
            self.handlers.write().await.remove(endpoint);
        }

        /// Cut an endpoint off (or reconnect it). Traffic in either
        /// direction fails while partitioned.
        pub async fn set_partitioned(&self, endpoint: &Endpoint, partitioned: bool) {
            let mut set = self.partitioned.write().await;
            if partitioned {
                set.insert(endpoint.clone());
            } else {
                set.remove(endpoint);
            }
        }

        /// Create a transport sending from `local`.
        pub fn transport(self: &Arc<Self>, local: Endpoint) -> MemoryTransport {
            MemoryTransport {
                local,
                network: Arc::clone(self),
            }
        }

        /// Number of messages accepted so far.
        pub fn delivered(&self) -> usize {
            self.delivered.load(Ordering::Relaxed)
        }
    }

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct MemoryTransport {
        local: Endpoint,
        network: Arc<MemoryNetwork>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, destination: &Endpoint, message: GossipMessage) -> Result<()> {
            {
                let partitioned = self.network.partitioned.read().await;
                if partitioned.contains(&self.local) || partitioned.contains(destination) {
                    return Err(SyncError::PeerUnreachable(destination.clone()));
                }
            }

            let handler = self
                .network
                .handlers
                .read()
                .await
                .get(destination)
                .cloned()
                .ok_or_else(|| SyncError::PeerUnreachable(destination.clone()))?;

            match handler.handle(message).await {
                Ok(()) => {
                    self.network.delivered.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                }
                Err(e) => Err(SyncError::Transport(format!(
                    "{} failed to handle message: {}",
                    destination, e
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use crate::error::SyncError;
    use crate::messages::WantMessage;
    use rumor_core::SummaryVector;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<GossipMessage>>,
    }

    #[async_trait]
    impl InboundHandler for Recorder {
        async fn handle(&self, message: GossipMessage) -> Result<()> {
            self.seen.lock().await.push(message);
            Ok(())
        }
    }

    fn want_from(endpoint: &str) -> GossipMessage {
        GossipMessage::Want(WantMessage {
            want: SummaryVector::new(),
            reply_endpoint: Endpoint::new(endpoint),
        })
    }

    #[tokio::test]
    async fn test_memory_transport_send() {
        let network = MemoryNetwork::new();
        let a = Endpoint::new("mem://a");
        let b = Endpoint::new("mem://b");

        let recorder = Arc::new(Recorder::default());
        network.register(b.clone(), recorder.clone()).await;

        let transport = network.transport(a);
        transport.send(&b, want_from("mem://a")).await.unwrap();

        let seen = recorder.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].reply_endpoint(), &Endpoint::new("mem://a"));
        assert_eq!(network.delivered(), 1);
    }

    #[tokio::test]
    async fn test_memory_transport_unknown_peer() {
        let network = MemoryNetwork::new();
        let transport = network.transport(Endpoint::new("mem://a"));

        let err = transport
            .send(&Endpoint::new("mem://nowhere"), want_from("mem://a"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PeerUnreachable(_)));
    }

    #[tokio::test]
    async fn test_memory_transport_partition() {
        let network = MemoryNetwork::new();
        let a = Endpoint::new("mem://a");
        let b = Endpoint::new("mem://b");
        let recorder = Arc::new(Recorder::default());
        network.register(b.clone(), recorder.clone()).await;
        let transport = network.transport(a);

        network.set_partitioned(&b, true).await;
        assert!(transport.send(&b, want_from("mem://a")).await.is_err());

        network.set_partitioned(&b, false).await;
        assert!(transport.send(&b, want_from("mem://a")).await.is_ok());
        assert_eq!(recorder.seen.lock().await.len(), 1);
    }
}
