//! # Index Sync Errors

use shared_crypto::CryptoError;
use shared_types::{CanonicalError, Locator, StoreError};
use thiserror::Error;

/// Errors from the content-addressed store collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentStoreError {
    /// Locator could not be retrieved.
    #[error("Fetch of {locator} failed: {reason}")]
    FetchFailed {
        /// Requested locator.
        locator: Locator,
        /// Failure description.
        reason: String,
    },

    /// Fetch did not finish in time.
    #[error("Fetch of {locator} timed out after {timeout_ms} ms")]
    Timeout {
        /// Requested locator.
        locator: Locator,
        /// Timeout applied.
        timeout_ms: u64,
    },

    /// Content could not be published.
    #[error("Publish of {filename} failed: {reason}")]
    PublishFailed {
        /// Name the content was published under.
        filename: String,
        /// Failure description.
        reason: String,
    },
}

/// Errors returned by `sync_contact`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// No contact follows this source.
    #[error("Unknown contact: {0}")]
    UnknownContact(String),

    /// The head snapshot could not be fetched or decoded.
    #[error("Index head {locator} unavailable: {reason}")]
    IndexUnavailable {
        /// Head locator.
        locator: Locator,
        /// Failure description.
        reason: String,
    },

    /// Contact registry or post store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by publishing operations.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No keypair, or signing failed.
    #[error("Signing failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Event could not be canonicalized or serialized.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Content store rejected the publish.
    #[error("Content store error: {0}")]
    Content(#[from] ContentStoreError),

    /// Post store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The head update could not be broadcast.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),

    /// A network-bound step exceeded its timeout.
    #[error("{step} timed out after {timeout_ms} ms")]
    Timeout {
        /// Step that timed out.
        step: &'static str,
        /// Timeout applied.
        timeout_ms: u64,
    },
}

impl From<CanonicalError> for PublishError {
    fn from(err: CanonicalError) -> Self {
        PublishError::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Encoding(err.to_string())
    }
}
