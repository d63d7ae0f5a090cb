//! Convergence verification.
//!
//! Lets tests and operators check whether two stores hold the same record
//! set, and if not, which positions each side lacks.

use std::collections::BTreeMap;

use rumor_core::{Record, RecordKey, StreamId};
use rumor_store::Store;

use crate::error::Result;

/// Rolling digest of a stream's records in sequence order.
///
/// `H = Blake3("rumor-stream-v0:" || len(id) || id || for each record:
/// key || len(originator) || originator || len(payload) || payload)`.
pub fn stream_digest(stream_id: &StreamId, records: &[Record]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"rumor-stream-v0:");
    hasher.update(&(stream_id.as_str().len() as u64).to_be_bytes());
    hasher.update(stream_id.as_str().as_bytes());

    for record in records {
        hasher.update(record.key().as_bytes());
        hasher.update(&(record.originator.len() as u64).to_be_bytes());
        hasher.update(record.originator.as_bytes());
        hasher.update(&(record.payload.len() as u64).to_be_bytes());
        hasher.update(record.payload.as_bytes());
    }

    *hasher.finalize().as_bytes()
}

/// Digest of every stream in a store.
pub async fn store_digests<S: Store>(store: &S) -> Result<BTreeMap<StreamId, [u8; 32]>> {
    let streams = store.list_streams().await?;
    Ok(streams
        .into_iter()
        .map(|(id, records)| {
            let digest = stream_digest(&id, &records);
            (id, digest)
        })
        .collect())
}

/// Result of comparing two stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Same records at the same positions with the same content.
    Converged,
    /// The stores differ.
    Diverged {
        /// Positions held by the remote but not the local store.
        missing_local: Vec<RecordKey>,
        /// Positions held by the local but not the remote store.
        missing_remote: Vec<RecordKey>,
        /// Positions both hold with different content.
        conflicting: Vec<RecordKey>,
    },
}

impl ConvergenceResult {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }
}

/// Compare two stores record by record.
pub async fn verify_convergence<L: Store, R: Store>(
    local: &L,
    remote: &R,
) -> Result<ConvergenceResult> {
    let local_digests = store_digests(local).await?;
    let remote_digests = store_digests(remote).await?;
    if local_digests == remote_digests {
        return Ok(ConvergenceResult::Converged);
    }

    let index = |streams: Vec<(StreamId, Vec<Record>)>| -> BTreeMap<RecordKey, Record> {
        streams
            .into_iter()
            .flat_map(|(_, records)| records)
            .map(|r| (r.key(), r))
            .collect()
    };
    let local_records = index(local.list_streams().await?);
    let remote_records = index(remote.list_streams().await?);

    let mut missing_local = Vec::new();
    let mut conflicting = Vec::new();
    for (key, record) in &remote_records {
        match local_records.get(key) {
            None => missing_local.push(*key),
            Some(ours) if ours != record => conflicting.push(*key),
            Some(_) => {}
        }
    }
    let missing_remote = local_records
        .keys()
        .filter(|k| !remote_records.contains_key(*k))
        .copied()
        .collect();

    Ok(ConvergenceResult::Diverged {
        missing_local,
        missing_remote,
        conflicting,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumor_store::MemoryStore;

    async fn store_with(records: &[Record]) -> MemoryStore {
        let store = MemoryStore::new();
        for r in records {
            store.merge_record(r).await.unwrap();
        }
        store
    }

    #[test]
    fn test_digest_depends_on_content() {
        let id = StreamId::new("s1");
        let a = vec![Record::new("s1", 0, "o", "x")];
        let b = vec![Record::new("s1", 0, "o", "y")];
        assert_eq!(stream_digest(&id, &a), stream_digest(&id, &a.clone()));
        assert_ne!(stream_digest(&id, &a), stream_digest(&id, &b));
    }

    #[test]
    fn test_digest_field_boundaries() {
        let id = StreamId::new("s1");
        let a = vec![Record::new("s1", 0, "ab", "c")];
        let b = vec![Record::new("s1", 0, "a", "bc")];
        assert_ne!(stream_digest(&id, &a), stream_digest(&id, &b));
    }

    #[tokio::test]
    async fn test_identical_stores_converged() {
        let records = vec![Record::new("s1", 0, "o", "x"), Record::new("s2", 3, "o", "y")];
        let a = store_with(&records).await;
        let b = store_with(&records).await;
        assert!(verify_convergence(&a, &b).await.unwrap().is_converged());
    }

    #[tokio::test]
    async fn test_divergence_reports_each_side() {
        let shared = Record::new("s1", 0, "o", "x");
        let only_a = Record::new("s1", 1, "o", "a");
        let only_b = Record::new("s2", 0, "o", "b");
        let a = store_with(&[shared.clone(), only_a.clone()]).await;
        let b = store_with(&[shared, only_b.clone()]).await;

        let result = verify_convergence(&a, &b).await.unwrap();
        assert_eq!(
            result,
            ConvergenceResult::Diverged {
                missing_local: vec![only_b.key()],
                missing_remote: vec![only_a.key()],
                conflicting: vec![],
            }
        );
    }

    #[tokio::test]
    async fn test_conflicting_position_detected() {
        let a = store_with(&[Record::new("s1", 0, "alice", "x")]).await;
        let b = store_with(&[Record::new("s1", 0, "bob", "x")]).await;

        match verify_convergence(&a, &b).await.unwrap() {
            ConvergenceResult::Diverged { conflicting, .. } => {
                assert_eq!(conflicting, vec![RecordKey::derive(&StreamId::new("s1"), 0)]);
            }
            other => panic!("expected divergence, got {:?}", other),
        }
    }
}
