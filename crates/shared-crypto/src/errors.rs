//! Crypto error types.

use shared_types::StoreError;
use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No keypair is provisioned, or it could not be loaded or saved.
    #[error("Key unavailable: {0}")]
    KeyUnavailable(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Base64 decoding failed
    #[error("Invalid base64: {0}")]
    Encoding(String),

    /// Key storage failure
    #[error("Key storage error: {0}")]
    Storage(#[from] StoreError),
}
