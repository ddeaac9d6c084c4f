//! Transport error types.

use thiserror::Error;

/// Errors from transport operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The pub/sub node could not be constructed or started.
    #[error("Transport initialization failed: {0}")]
    Init(String),

    /// Start did not complete within the configured timeout.
    #[error("Transport start timed out after {0} ms")]
    StartTimeout(u64),

    /// Publishing to the network failed.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Publish did not complete within the configured timeout.
    #[error("Publish timed out after {0} ms")]
    PublishTimeout(u64),

    /// The transport was stopped.
    #[error("Transport stopped")]
    Stopped,

    /// Message exceeds the configured size limit.
    #[error("Message of {size} bytes exceeds limit of {max} bytes")]
    MessageTooLarge {
        /// Encoded size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Address is not a valid multiaddr, or dialing it failed.
    #[error("Invalid peer address: {0}")]
    InvalidPeer(String),

    /// Event could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}
