//! Strong type definitions for Rumor.
//!
//! Identifiers are newtypes so a stream ID can never be passed where an
//! endpoint is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier grouping an ordered family of records from one producer/topic.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Create a stream ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Network address of a node: the URL it accepts gossip messages on.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self.0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Endpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A 32-byte record key, computed as Blake3 over `(stream_id, sequence)`.
///
/// Two records at the same stream position always share a key, which is
/// what makes merging idempotent.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(pub [u8; 32]);

impl RecordKey {
    /// Derive the key for a stream position.
    pub fn derive(stream_id: &StreamId, sequence: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"rumor-record-v0:");
        hasher.update(&(stream_id.as_str().len() as u64).to_be_bytes());
        hasher.update(stream_id.as_str().as_bytes());
        hasher.update(&sequence.to_be_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_deterministic() {
        let s = StreamId::new("s1");
        assert_eq!(RecordKey::derive(&s, 7), RecordKey::derive(&s, 7));
    }

    #[test]
    fn test_record_key_distinguishes_positions() {
        let s = StreamId::new("s1");
        assert_ne!(RecordKey::derive(&s, 1), RecordKey::derive(&s, 2));
        assert_ne!(
            RecordKey::derive(&StreamId::new("a"), 1),
            RecordKey::derive(&StreamId::new("b"), 1)
        );
    }

    #[test]
    fn test_record_key_length_prefix() {
        // "ab" + seq must not collide with "a" + a seq whose bytes start with 'b'
        let k1 = RecordKey::derive(&StreamId::new("ab"), 0);
        let k2 = RecordKey::derive(&StreamId::new("a"), 0x6200_0000_0000_0000);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_record_key_hex_roundtrip() {
        let key = RecordKey::derive(&StreamId::new("s1"), 3);
        assert_eq!(RecordKey::from_hex(&key.to_hex()).unwrap(), key);
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&StreamId::new("topic")).unwrap();
        assert_eq!(json, "\"topic\"");
        let json = serde_json::to_string(&Endpoint::new("https://a/gossip")).unwrap();
        assert_eq!(json, "\"https://a/gossip\"");
    }
}
