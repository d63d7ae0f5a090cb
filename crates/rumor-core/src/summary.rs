//! Summary vector: a node's compact epidemic state digest.
//!
//! Maps each known stream to the highest sequence number held locally.
//! A stream missing from the map means "no knowledge of this stream".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::Record;
use crate::types::StreamId;

/// Per-stream high-water marks, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryVector(BTreeMap<StreamId, u64>);

impl SummaryVector {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Highest known sequence for a stream, if any.
    pub fn get(&self, stream_id: &StreamId) -> Option<u64> {
        self.0.get(stream_id).copied()
    }

    /// Set the entry for a stream, replacing any previous value.
    pub fn insert(&mut self, stream_id: StreamId, sequence: u64) {
        self.0.insert(stream_id, sequence);
    }

    /// Raise the entry for a stream to at least `sequence`.
    ///
    /// Never lowers an existing entry.
    pub fn observe(&mut self, stream_id: &StreamId, sequence: u64) {
        match self.0.get_mut(stream_id) {
            Some(current) => {
                if sequence > *current {
                    *current = sequence;
                }
            }
            None => {
                self.0.insert(stream_id.clone(), sequence);
            }
        }
    }

    /// Whether the summary claims to hold `record`.
    pub fn covers(&self, record: &Record) -> bool {
        matches!(self.get(&record.stream_id), Some(n) if record.sequence <= n)
    }

    /// Number of streams in the summary.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the summary knows no streams.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in stream order.
    pub fn iter(&self) -> impl Iterator<Item = (&StreamId, u64)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(StreamId, u64)> for SummaryVector {
    fn from_iter<I: IntoIterator<Item = (StreamId, u64)>>(iter: I) -> Self {
        let mut summary = SummaryVector::new();
        for (stream_id, sequence) in iter {
            summary.observe(&stream_id, sequence);
        }
        summary
    }
}

impl<'a> FromIterator<&'a Record> for SummaryVector {
    fn from_iter<I: IntoIterator<Item = &'a Record>>(iter: I) -> Self {
        let mut summary = SummaryVector::new();
        for record in iter {
            summary.observe(&record.stream_id, record.sequence);
        }
        summary
    }
}

impl IntoIterator for SummaryVector {
    type Item = (StreamId, u64);
    type IntoIter = std::collections::btree_map::IntoIter<StreamId, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
