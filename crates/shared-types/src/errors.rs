//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors produced while building the canonical encoding of an event.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The value could not be converted to JSON.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Only JSON objects have a canonical field order.
    #[error("Canonical encoding requires a JSON object")]
    NotAnObject,
}

/// Errors reported by local storage collaborators (post store, contact
/// registry, key storage).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Reading or writing the backing store failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored record could not be decoded.
    #[error("Corrupt record {key}: {reason}")]
    Corrupt {
        /// Storage key of the record.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
