//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{btree_map::Entry, BTreeMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use rumor_core::{Endpoint, ObservedWant, Peer, Record, StreamId, SummaryVector};

use crate::error::{Result, StoreError};
use crate::traits::{MergeResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records per stream, keyed by sequence.
    streams: BTreeMap<StreamId, BTreeMap<u64, Record>>,

    /// Peers keyed by endpoint.
    peers: BTreeMap<Endpoint, Peer>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.read()
            .map(|inner| inner.streams.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn merge_record(&self, record: &Record) -> Result<MergeResult> {
        let mut inner = self.write()?;
        let stream = inner.streams.entry(record.stream_id.clone()).or_default();

        match stream.entry(record.sequence) {
            Entry::Occupied(_) => Ok(MergeResult::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(MergeResult::Inserted)
            }
        }
    }

    async fn get_stream(&self, stream_id: &StreamId) -> Result<Vec<Record>> {
        let inner = self.read()?;
        Ok(inner
            .streams
            .get(stream_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_streams(&self) -> Result<Vec<(StreamId, Vec<Record>)>> {
        let inner = self.read()?;
        Ok(inner
            .streams
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(id, records)| (id.clone(), records.values().cloned().collect()))
            .collect())
    }

    async fn stream_heads(&self) -> Result<SummaryVector> {
        let inner = self.read()?;
        Ok(inner
            .streams
            .iter()
            .filter_map(|(id, records)| {
                records.keys().next_back().map(|seq| (id.clone(), *seq))
            })
            .collect())
    }

    async fn insert_peer_if_absent(&self, endpoint: &Endpoint) -> Result<bool> {
        let mut inner = self.write()?;
        match inner.peers.entry(endpoint.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Peer::new(endpoint.clone()));
                Ok(true)
            }
        }
    }

    async fn upsert_peer(&self, endpoint: &Endpoint, want: &ObservedWant) -> Result<()> {
        let mut inner = self.write()?;
        let peer = inner
            .peers
            .entry(endpoint.clone())
            .or_insert_with(|| Peer::new(endpoint.clone()));
        peer.last_reported_want = want.clone();
        Ok(())
    }

    async fn find_peer(&self, endpoint: &Endpoint) -> Result<Option<Peer>> {
        let inner = self.read()?;
        Ok(inner.peers.get(endpoint).cloned())
    }

    async fn list_peers(&self) -> Result<Vec<Peer>> {
        let inner = self.read()?;
        Ok(inner.peers.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_store_merge() {
        let store = MemoryStore::new();
        let record = Record::new("s1", 0, "alice", "hello");

        let result = store.merge_record(&record).await.unwrap();
        assert_eq!(result, MergeResult::Inserted);

        let stream = store.get_stream(&StreamId::new("s1")).await.unwrap();
        assert_eq!(stream, vec![record]);
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let record = Record::new("s1", 0, "alice", "hello");

        let r1 = store.merge_record(&record).await.unwrap();
        assert_eq!(r1, MergeResult::Inserted);
        let before = store.list_streams().await.unwrap();

        let r2 = store.merge_record(&record).await.unwrap();
        assert_eq!(r2, MergeResult::Duplicate);
        assert_eq!(store.list_streams().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_duplicate_position_keeps_first() {
        let store = MemoryStore::new();
        store
            .merge_record(&Record::new("s1", 0, "alice", "first"))
            .await
            .unwrap();
        let result = store
            .merge_record(&Record::new("s1", 0, "mallory", "second"))
            .await
            .unwrap();

        assert_eq!(result, MergeResult::Duplicate);
        let stream = store.get_stream(&StreamId::new("s1")).await.unwrap();
        assert_eq!(stream[0].payload, "first");
    }

    #[tokio::test]
    async fn test_streams_ordered_by_sequence() {
        let store = MemoryStore::new();
        for seq in [2, 0, 1] {
            store
                .merge_record(&Record::new("s1", seq, "alice", ""))
                .await
                .unwrap();
        }

        let streams = store.list_streams().await.unwrap();
        let seqs: Vec<u64> = streams[0].1.iter().map(|r| r.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);

        let heads = store.stream_heads().await.unwrap();
        assert_eq!(heads.get(&StreamId::new("s1")), Some(2));
    }

    #[tokio::test]
    async fn test_peer_insert_if_absent() {
        let store = MemoryStore::new();
        let endpoint = Endpoint::new("http://b/gossip");

        assert!(store.insert_peer_if_absent(&endpoint).await.unwrap());
        assert!(!store.insert_peer_if_absent(&endpoint).await.unwrap());
        assert_eq!(store.list_peers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_peer_insert_creates_one() {
        let store = Arc::new(MemoryStore::new());
        let endpoint = Endpoint::new("http://b/gossip");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let endpoint = endpoint.clone();
            handles.push(tokio::spawn(async move {
                store.insert_peer_if_absent(&endpoint).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.list_peers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_peer_overwrites_want() {
        let store = MemoryStore::new();
        let endpoint = Endpoint::new("http://b/gossip");

        let mut first = SummaryVector::new();
        first.insert(StreamId::new("s1"), 5);
        first.insert(StreamId::new("s2"), 1);
        store
            .upsert_peer(&endpoint, &ObservedWant::observed(first, 1))
            .await
            .unwrap();

        let mut second = SummaryVector::new();
        second.insert(StreamId::new("s1"), 2);
        store
            .upsert_peer(&endpoint, &ObservedWant::observed(second.clone(), 2))
            .await
            .unwrap();

        let peer = store.find_peer(&endpoint).await.unwrap().unwrap();
        assert_eq!(peer.last_reported_want.vector, second);
        assert_eq!(peer.last_reported_want.observed_at, Some(2));
    }

    fn positions() -> impl proptest::strategy::Strategy<Value = Vec<(String, u64)>> {
        proptest::collection::vec(("[a-c]", 0u64..10), 0..30)
    }

    fn run<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    proptest::proptest! {
        #[test]
        fn prop_merge_order_does_not_matter(positions in positions()) {
            let records: Vec<Record> = positions
                .iter()
                .map(|(s, n)| Record::new(s.as_str(), *n, "o", format!("{}:{}", s, n)))
                .collect();

            let (forward, backward) = run(async {
                let a = MemoryStore::new();
                let b = MemoryStore::new();
                for r in &records {
                    a.merge_record(r).await.unwrap();
                }
                for r in records.iter().rev() {
                    b.merge_record(r).await.unwrap();
                }
                (a.list_streams().await.unwrap(), b.list_streams().await.unwrap())
            });
            proptest::prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_heads_match_stream_maxima(positions in positions()) {
            let (heads, streams) = run(async {
                let store = MemoryStore::new();
                for (s, n) in &positions {
                    store.merge_record(&Record::new(s.as_str(), *n, "o", "")).await.unwrap();
                }
                (store.stream_heads().await.unwrap(), store.list_streams().await.unwrap())
            });

            proptest::prop_assert_eq!(heads.len(), streams.len());
            for (id, records) in &streams {
                let max = records.iter().map(|r| r.sequence).max();
                proptest::prop_assert_eq!(heads.get(id), max);
            }
        }
    }
}
