use std::io;

use checkin_types::{InvariantViolation, ValidationError};
use thiserror::Error;

/// A read, write or delete against the journey store failed.
///
/// The previously persisted value is untouched and so is the caller's
/// in-memory state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read '{key}': {source}")]
    Read {
        key: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to write '{key}': {source}")]
    Write {
        key: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to clear '{key}': {source}")]
    Delete {
        key: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("'{key}' holds malformed JSON: {source}")]
    Decode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum JourneyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("stored journey is invalid: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl JourneyError {
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
