//! Boundary validation for inbound records, wants, and endpoints.
//!
//! Malformed input is rejected here, before it reaches storage or the
//! reconciliation engine.

use crate::error::ValidationError;
use crate::record::Record;
use crate::summary::SummaryVector;
use crate::types::{Endpoint, StreamId};

/// Size limits for values accepted from the network.
pub mod limits {
    /// Max bytes in a stream ID.
    pub const MAX_STREAM_ID_LEN: usize = 256;
    /// Max bytes in an originator name.
    pub const MAX_ORIGINATOR_LEN: usize = 256;
    /// Max bytes in a record payload.
    pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;
    /// Max bytes in an endpoint.
    pub const MAX_ENDPOINT_LEN: usize = 2048;
    /// Max streams in a want vector.
    pub const MAX_WANT_ENTRIES: usize = 10_000;
    /// Largest storable sequence number (SQLite integers are signed).
    pub const MAX_SEQUENCE: u64 = i64::MAX as u64;
}

fn check_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacters(field));
    }
    Ok(())
}

fn validate_stream_id(stream_id: &StreamId) -> Result<(), ValidationError> {
    check_text("stream id", stream_id.as_str(), limits::MAX_STREAM_ID_LEN)
}

/// Validate an endpoint.
pub fn validate_endpoint(endpoint: &Endpoint) -> Result<(), ValidationError> {
    check_text("endpoint", endpoint.as_str(), limits::MAX_ENDPOINT_LEN)?;
    if endpoint.as_str().chars().any(char::is_whitespace) {
        return Err(ValidationError::ControlCharacters("endpoint"));
    }
    Ok(())
}

/// Validate the name stamped on records a node authors.
pub fn validate_originator(originator: &str) -> Result<(), ValidationError> {
    check_text("originator", originator, limits::MAX_ORIGINATOR_LEN)
}

/// Validate a record's structure.
///
/// The payload is opaque and may be empty; only its size is bounded.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    validate_stream_id(&record.stream_id)?;
    validate_originator(&record.originator)?;
    if record.sequence > limits::MAX_SEQUENCE {
        return Err(ValidationError::SequenceOutOfRange(record.sequence));
    }
    if record.payload.len() > limits::MAX_PAYLOAD_LEN {
        return Err(ValidationError::TooLong {
            field: "payload",
            len: record.payload.len(),
            max: limits::MAX_PAYLOAD_LEN,
        });
    }
    Ok(())
}

/// Validate a want vector. An empty vector is valid.
pub fn validate_want(want: &SummaryVector) -> Result<(), ValidationError> {
    if want.len() > limits::MAX_WANT_ENTRIES {
        return Err(ValidationError::TooManyEntries {
            len: want.len(),
            max: limits::MAX_WANT_ENTRIES,
        });
    }
    for (stream_id, _) in want.iter() {
        validate_stream_id(stream_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = Record::new("s1", 0, "alice", "");
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn test_empty_stream_id_rejected() {
        let record = Record::new("", 0, "alice", "x");
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::Empty("stream id"))
        );
    }

    #[test]
    fn test_empty_originator_rejected() {
        let record = Record::new("s1", 0, "", "x");
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::Empty("originator"))
        );
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = "x".repeat(limits::MAX_PAYLOAD_LEN + 1);
        let record = Record::new("s1", 0, "alice", payload);
        assert!(matches!(
            validate_record(&record),
            Err(ValidationError::TooLong { field: "payload", .. })
        ));
    }

    #[test]
    fn test_sequence_bound() {
        let record = Record::new("s1", u64::MAX, "alice", "x");
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::SequenceOutOfRange(u64::MAX))
        );
    }

    #[test]
    fn test_endpoint_rules() {
        assert!(validate_endpoint(&Endpoint::new("https://node-a:8443/gossip")).is_ok());
        assert!(validate_endpoint(&Endpoint::new("")).is_err());
        assert!(validate_endpoint(&Endpoint::new("http://a b")).is_err());
    }

    #[test]
    fn test_originator_rules() {
        assert!(validate_originator("node-a").is_ok());
        assert_eq!(
            validate_originator("node\u{7}a"),
            Err(ValidationError::ControlCharacters("originator"))
        );
        assert!(validate_originator(&"o".repeat(limits::MAX_ORIGINATOR_LEN + 1)).is_err());
    }

    #[test]
    fn test_want_rules() {
        assert!(validate_want(&SummaryVector::new()).is_ok());

        let mut want = SummaryVector::new();
        want.insert(StreamId::new("ok"), 1);
        assert!(validate_want(&want).is_ok());

        want.insert(StreamId::new(""), 1);
        assert!(validate_want(&want).is_err());
    }
}
