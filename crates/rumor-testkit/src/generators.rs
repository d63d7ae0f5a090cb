//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use rumor_core::{Endpoint, Record, StreamId, SummaryVector};
use rumor_sync::{GossipMessage, RecordMessage, WantMessage};

/// Generate a short stream ID from a small alphabet, so streams collide.
pub fn stream_id() -> impl Strategy<Value = StreamId> {
    "[a-e]{1,3}".prop_map(StreamId::new)
}

/// Generate a gossip endpoint URL.
pub fn endpoint() -> impl Strategy<Value = Endpoint> {
    ("[a-z]{1,8}", 1024u16..65535)
        .prop_map(|(host, port)| Endpoint::new(format!("https://{}:{}/gossip", host, port)))
}

/// Generate a sequence number.
pub fn sequence() -> impl Strategy<Value = u64> {
    0u64..64
}

/// Generate payload text of at most `max_len` characters.
pub fn payload(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_len).prop_map(|chars| chars.into_iter().collect())
}

/// Generate a record.
pub fn record() -> impl Strategy<Value = Record> {
    (stream_id(), sequence(), "[a-z]{1,8}", payload(32))
        .prop_map(|(stream, seq, originator, payload)| Record::new(stream, seq, originator, payload))
}

/// Generate records with distinct `(stream, sequence)` positions.
pub fn record_set(max: usize) -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record(), 0..=max).prop_map(|records| {
        let mut by_position = BTreeMap::new();
        for r in records {
            by_position.entry(r.key()).or_insert(r);
        }
        by_position.into_values().collect()
    })
}

/// Generate a summary vector.
pub fn summary_vector() -> impl Strategy<Value = SummaryVector> {
    prop::collection::btree_map(stream_id(), sequence(), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Generate a want message.
pub fn want_message() -> impl Strategy<Value = WantMessage> {
    (summary_vector(), endpoint()).prop_map(|(want, reply_endpoint)| WantMessage {
        want,
        reply_endpoint,
    })
}

/// Generate a record message.
pub fn record_message() -> impl Strategy<Value = RecordMessage> {
    (record(), endpoint()).prop_map(|(record, reply)| RecordMessage::new(record, reply))
}

/// Generate either kind of gossip message.
pub fn gossip_message() -> impl Strategy<Value = GossipMessage> {
    prop_oneof![
        want_message().prop_map(GossipMessage::Want),
        record_message().prop_map(GossipMessage::Record),
    ]
}
