//! Peer registry: known endpoints and their last self-reported wants.

use std::sync::Arc;

use rumor_core::{now_millis, Endpoint, ObservedWant, Peer, SummaryVector};
use rumor_store::Store;

use crate::error::Result;

/// Tracks known peers on top of the store.
///
/// Peers are never removed. Concurrent `ensure_peer` calls for the same
/// endpoint rely on the store's conditional insert to create one record.
pub struct PeerRegistry<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for PeerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> PeerRegistry<S> {
    /// Create a registry over a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Make sure a peer exists. Returns `true` if it was just created.
    pub async fn ensure_peer(&self, endpoint: &Endpoint) -> Result<bool> {
        let created = self.store.insert_peer_if_absent(endpoint).await?;
        if created {
            tracing::info!(peer = %endpoint, "peer added");
        } else {
            tracing::trace!(peer = %endpoint, "peer already known");
        }
        Ok(created)
    }

    /// Overwrite the peer's last reported want. Last writer wins.
    pub async fn record_want(&self, endpoint: &Endpoint, want: SummaryVector) -> Result<()> {
        let observed = ObservedWant::observed(want, now_millis());
        self.store.upsert_peer(endpoint, &observed).await?;
        Ok(())
    }

    /// Every known endpoint, in no particular order.
    pub async fn list_peer_endpoints(&self) -> Result<Vec<Endpoint>> {
        let peers = self.store.list_peers().await?;
        Ok(peers.into_iter().map(|p| p.endpoint).collect())
    }

    /// Full peer records, for diagnostics.
    pub async fn list_peers(&self) -> Result<Vec<Peer>> {
        Ok(self.store.list_peers().await?)
    }

    /// Look up one peer.
    pub async fn find_peer(&self, endpoint: &Endpoint) -> Result<Option<Peer>> {
        Ok(self.store.find_peer(endpoint).await?)
    }

    /// Introduce peers configured out of band. Returns how many were new.
    pub async fn seed<'a, I>(&self, endpoints: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Endpoint>,
    {
        let mut added = 0;
        for endpoint in endpoints {
            if self.ensure_peer(endpoint).await? {
                added += 1;
            }
        }
        Ok(added)
    }
}
