//! # Ed25519 Signatures
//!
//! Twisted Edwards curve signatures with deterministic nonces, plus the
//! base64 codecs used on the wire.
//!
//! ## Security Properties
//!
//! - No RNG dependency when signing (deterministic nonce from message)
//! - Public keys are checked to decode to a curve point on construction

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

use crate::keystore::StoredKeypair;
use crate::CryptoError;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let raw = decode_b64(encoded)?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                actual: raw.len(),
            })?;
        Self::from_bytes(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Standard base64 encoding.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let raw = decode_b64(encoded)?;
        let bytes: [u8; 64] = raw
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Standard base64 encoding.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Restore a keypair from its stored form.
    ///
    /// The stored public key must match the one derived from the secret.
    pub fn from_stored(stored: &StoredKeypair) -> Result<Self, CryptoError> {
        let mut raw = decode_b64(&stored.secret_key)?;
        let seed: Result<[u8; 32], _> = raw.as_slice().try_into();
        let actual = raw.len();
        raw.zeroize();
        let mut seed = seed.map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual,
        })?;
        let keypair = Self::from_seed(seed);
        seed.zeroize();

        if keypair.public_key().to_base64() != stored.public_key {
            return Err(CryptoError::InvalidPrivateKey);
        }
        Ok(keypair)
    }

    /// Stored form (`publicKey` / `secretKey`, base64).
    pub fn to_stored(&self) -> StoredKeypair {
        let mut seed = self.to_seed();
        let stored = StoredKeypair {
            public_key: self.public_key().to_base64(),
            secret_key: general_purpose::STANDARD.encode(seed),
        };
        seed.zeroize();
        stored
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        Ed25519PublicKey(verifying_key.to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

fn decode_b64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Ed25519KeyPair::generate();
        let message = b"Hello, Ed25519!";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Ed25519KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = Ed25519KeyPair::generate();
        let keypair2 = Ed25519KeyPair::generate();
        let message = b"test";

        let signature = keypair1.sign(message);
        let result = keypair2.public_key().verify(message, &signature);

        assert!(result.is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let keypair = Ed25519KeyPair::from_seed([7u8; 32]);
        let pk = keypair.public_key();
        let decoded = Ed25519PublicKey::from_base64(&pk.to_base64()).unwrap();
        assert_eq!(decoded, pk);

        let sig = keypair.sign(b"x");
        assert_eq!(Ed25519Signature::from_base64(&sig.to_base64()).unwrap(), sig);
    }

    #[test]
    fn test_short_key_rejected() {
        let encoded = general_purpose::STANDARD.encode([1u8; 16]);
        let err = Ed25519PublicKey::from_base64(&encoded).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        ));
    }

    #[test]
    fn test_stored_roundtrip() {
        let keypair = Ed25519KeyPair::generate();
        let restored = Ed25519KeyPair::from_stored(&keypair.to_stored()).unwrap();
        assert_eq!(restored.public_key(), keypair.public_key());
    }

    #[test]
    fn test_stored_mismatched_public_key_rejected() {
        let mut stored = Ed25519KeyPair::generate().to_stored();
        stored.public_key = Ed25519KeyPair::generate().public_key().to_base64();
        assert!(matches!(
            Ed25519KeyPair::from_stored(&stored),
            Err(CryptoError::InvalidPrivateKey)
        ));
    }
}
