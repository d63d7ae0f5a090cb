//! Gossip protocol message types.
//!
//! Two logical messages travel between nodes: a `Want` carrying the sender's
//! summary vector, and a `Record` carrying a single pushed record. Records
//! are never batched on the wire.

use serde::{Deserialize, Serialize};

use rumor_core::{
    validate_endpoint, validate_record, validate_want, Endpoint, Record, StreamId, SummaryVector,
    ValidationError,
};

pub use rumor_core::validation::limits;

/// "Here is what I have; send me what I am missing."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WantMessage {
    /// Sender's per-stream high-water marks.
    pub want: SummaryVector,
    /// Where the sender accepts gossip.
    pub reply_endpoint: Endpoint,
}

impl WantMessage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_endpoint(&self.reply_endpoint)?;
        validate_want(&self.want)
    }
}

/// A single record pushed to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMessage {
    pub stream_id: StreamId,
    pub originator: String,
    pub sequence: u64,
    pub payload: String,
    /// Where the sender accepts gossip.
    pub reply_endpoint: Endpoint,
}

impl RecordMessage {
    /// Wrap a record for transmission.
    pub fn new(record: Record, reply_endpoint: Endpoint) -> Self {
        Self {
            stream_id: record.stream_id,
            originator: record.originator,
            sequence: record.sequence,
            payload: record.payload,
            reply_endpoint,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_endpoint(&self.reply_endpoint)?;
        validate_record(&self.to_record())
    }

    /// The record carried by this message.
    pub fn to_record(&self) -> Record {
        Record {
            stream_id: self.stream_id.clone(),
            sequence: self.sequence,
            originator: self.originator.clone(),
            payload: self.payload.clone(),
        }
    }
}

/// Envelope for everything a node accepts, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GossipMessage {
    Want(WantMessage),
    Record(RecordMessage),
}

impl GossipMessage {
    /// Check structure and size limits before anything touches state.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GossipMessage::Want(msg) => msg.validate(),
            GossipMessage::Record(msg) => msg.validate(),
        }
    }

    /// The sender's reply endpoint.
    pub fn reply_endpoint(&self) -> &Endpoint {
        match self {
            GossipMessage::Want(msg) => &msg.reply_endpoint,
            GossipMessage::Record(msg) => &msg.reply_endpoint,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GossipMessage::Want(_) => "want",
            GossipMessage::Record(_) => "record",
        }
    }
}

impl From<WantMessage> for GossipMessage {
    fn from(msg: WantMessage) -> Self {
        GossipMessage::Want(msg)
    }
}

impl From<RecordMessage> for GossipMessage {
    fn from(msg: RecordMessage) -> Self {
        GossipMessage::Record(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_want_wire_shape() {
        let mut want = SummaryVector::new();
        want.insert(StreamId::new("s1"), 0);
        let msg = GossipMessage::Want(WantMessage {
            want,
            reply_endpoint: Endpoint::new("https://b/gossip"),
        });

        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "want",
                "want": { "s1": 0 },
                "replyEndpoint": "https://b/gossip"
            })
        );
    }

    #[test]
    fn test_record_wire_shape() {
        let record = Record::new("s1", 2, "alice", "hi");
        let msg = GossipMessage::Record(RecordMessage::new(
            record.clone(),
            Endpoint::new("https://a/gossip"),
        ));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "record");
        assert_eq!(json["streamId"], "s1");
        assert_eq!(json["sequence"], 2);
        assert_eq!(json["originator"], "alice");
        assert_eq!(json["payload"], "hi");

        let back: GossipMessage = serde_json::from_value(json).unwrap();
        match back {
            GossipMessage::Record(m) => assert_eq!(m.to_record(), record),
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_rejected() {
        let result: Result<GossipMessage, _> =
            serde_json::from_str(r#"{"kind":"want","want":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_reply_endpoint() {
        let msg = GossipMessage::Want(WantMessage {
            want: SummaryVector::new(),
            reply_endpoint: Endpoint::new(""),
        });
        assert!(msg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_record() {
        let msg = GossipMessage::Record(RecordMessage::new(
            Record::new("", 0, "alice", "x"),
            Endpoint::new("https://a/gossip"),
        ));
        assert!(msg.validate().is_err());
    }
}
