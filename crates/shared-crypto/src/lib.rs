//! # Shared Crypto - Signing and Verification
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `signatures` | Ed25519 keypair, public key and signature types with base64 codecs |
//! | `signer` | Lazy-provisioned signer and never-failing verifier |
//! | `keystore` | Key storage port and stored keypair format |
//! | `fingerprint` | Short display identifier of a public key |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **Verification** never panics or errors on hostile input
//! - **Fingerprints** are for display only and carry no trust

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod fingerprint;
pub mod keystore;
pub mod signatures;
pub mod signer;

// Re-exports
pub use errors::CryptoError;
pub use fingerprint::fingerprint;
pub use keystore::{InMemoryKeyStorage, KeyStorage, StoredKeypair, KEYPAIR_STORAGE_KEY};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use signer::{
    fingerprint_base64, verify_signature, Ed25519Signer, KeyProvisioning, SignatureService,
    VerifyFailure, VerifyOutcome,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
