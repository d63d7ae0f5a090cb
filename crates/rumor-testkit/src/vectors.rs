//! Wire vectors for the gossip JSON format.
//!
//! Each vector pairs a message with the exact JSON other implementations
//! send and accept. Keys appear in the order serde emits them.

use rumor_core::{Endpoint, Record, StreamId, SummaryVector};
use rumor_sync::{GossipMessage, RecordMessage, WantMessage};

/// A wire test vector.
#[derive(Debug, Clone)]
pub struct WireVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The message.
    pub message: GossipMessage,
    /// Expected compact JSON.
    pub json: &'static str,
}

fn want(entries: &[(&str, u64)], reply: &str) -> GossipMessage {
    GossipMessage::Want(WantMessage {
        want: entries
            .iter()
            .map(|(s, n)| (StreamId::new(*s), *n))
            .collect::<SummaryVector>(),
        reply_endpoint: Endpoint::new(reply),
    })
}

fn record(stream: &str, seq: u64, originator: &str, payload: &str, reply: &str) -> GossipMessage {
    GossipMessage::Record(RecordMessage::new(
        Record::new(stream, seq, originator, payload),
        Endpoint::new(reply),
    ))
}

/// Get all wire vectors.
pub fn all_vectors() -> Vec<WireVector> {
    vec![
        WireVector {
            name: "empty want",
            message: want(&[], "https://a.example/gossip"),
            json: r#"{"kind":"want","want":{},"replyEndpoint":"https://a.example/gossip"}"#,
        },
        WireVector {
            name: "want with two streams",
            message: want(&[("s2", 7), ("s1", 0)], "https://b.example/gossip"),
            json: r#"{"kind":"want","want":{"s1":0,"s2":7},"replyEndpoint":"https://b.example/gossip"}"#,
        },
        WireVector {
            name: "record",
            message: record("s1", 2, "alice", "hello", "https://a.example/gossip"),
            json: r#"{"kind":"record","streamId":"s1","originator":"alice","sequence":2,"payload":"hello","replyEndpoint":"https://a.example/gossip"}"#,
        },
        WireVector {
            name: "record with empty payload",
            message: record("s1", 0, "bob", "", "https://b.example/gossip"),
            json: r#"{"kind":"record","streamId":"s1","originator":"bob","sequence":0,"payload":"","replyEndpoint":"https://b.example/gossip"}"#,
        },
    ]
}

/// Check every vector both ways: encoding matches and decoding round-trips.
///
/// Returns `(name, ok)` per vector.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    all_vectors()
        .into_iter()
        .map(|v| {
            let encoded = serde_json::to_string(&v.message).ok();
            let decoded: Option<GossipMessage> = serde_json::from_str(v.json).ok();
            let ok = encoded.as_deref() == Some(v.json) && decoded.as_ref() == Some(&v.message);
            (v.name, ok)
        })
        .collect()
}
