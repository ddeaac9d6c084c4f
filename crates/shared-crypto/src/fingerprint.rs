//! # Key Fingerprints
//!
//! Short display identifiers for public keys. Never used for trust.

use sha2::{Digest, Sha256};

/// Prefix of every fingerprint.
pub const FINGERPRINT_PREFIX: &str = "fpr-";

/// Number of digest bytes rendered into the fingerprint.
pub const FINGERPRINT_BYTES: usize = 6;

/// Fingerprint of a raw public key: `fpr-` followed by the hex of the
/// first six bytes of its SHA-256 digest.
pub fn fingerprint(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    format!(
        "{FINGERPRINT_PREFIX}{}",
        hex::encode(&digest[..FINGERPRINT_BYTES])
    )
}
