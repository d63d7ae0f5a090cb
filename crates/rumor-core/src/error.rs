//! Error types for Rumor Core.

use thiserror::Error;

/// Reasons an inbound value is rejected at the protocol boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty {0}")]
    Empty(&'static str),

    #[error("{field} too long: {len} bytes (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("want vector has {len} entries (max {max})")]
    TooManyEntries { len: usize, max: usize },

    #[error("sequence {0} out of range")]
    SequenceOutOfRange(u64),

    #[error("{0} contains control characters")]
    ControlCharacters(&'static str),
}
