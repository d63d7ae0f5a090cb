//! Peer: a known remote node.

use serde::{Deserialize, Serialize};

use crate::summary::SummaryVector;
use crate::types::Endpoint;

/// The summary a peer last reported about itself.
///
/// This is the last value observed, not an authoritative view: under
/// network reordering a stale want can overwrite a fresher one. Nothing in
/// the protocol reads it back for correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedWant {
    /// The reported summary vector.
    pub vector: SummaryVector,
    /// When it was recorded (local Unix ms). `None` if never reported.
    pub observed_at: Option<i64>,
}

impl ObservedWant {
    /// A want observed at `now`.
    pub fn observed(vector: SummaryVector, now: i64) -> Self {
        Self {
            vector,
            observed_at: Some(now),
        }
    }

    /// Whether the peer has ever reported a want.
    pub fn is_reported(&self) -> bool {
        self.observed_at.is_some()
    }
}

/// A known remote node.
///
/// Created on first contact, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Address used to reach the peer.
    pub endpoint: Endpoint,
    /// Last self-reported summary.
    pub last_reported_want: ObservedWant,
}

impl Peer {
    /// A freshly introduced peer with no reported want.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            last_reported_want: ObservedWant::default(),
        }
    }
}
