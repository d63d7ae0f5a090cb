//! Record: the immutable unit of gossip content.

use serde::{Deserialize, Serialize};

use crate::types::{RecordKey, StreamId};

/// An immutable record in a stream.
///
/// Records are append-only: once stored they are never mutated or deleted.
/// At most one record exists per `(stream_id, sequence)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The stream this record belongs to.
    pub stream_id: StreamId,
    /// Position within the stream, assigned by the originator.
    pub sequence: u64,
    /// Identity of the producer.
    pub originator: String,
    /// Opaque content.
    pub payload: String,
}

impl Record {
    /// Create a record.
    pub fn new(
        stream_id: impl Into<StreamId>,
        sequence: u64,
        originator: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            stream_id: stream_id.into(),
            sequence,
            originator: originator.into(),
            payload: payload.into(),
        }
    }

    /// The deduplication key for this record.
    pub fn key(&self) -> RecordKey {
        RecordKey::derive(&self.stream_id, self.sequence)
    }

    /// Human-readable identifier, `"<stream>:<sequence>"`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.stream_id, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_payload() {
        let a = Record::new("s1", 4, "alice", "hello");
        let b = Record::new("s1", 4, "bob", "different");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_label() {
        let r = Record::new("news", 12, "alice", "x");
        assert_eq!(r.label(), "news:12");
    }
}
