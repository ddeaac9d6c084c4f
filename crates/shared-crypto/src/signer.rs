//! # Signer/Verifier Adapter
//!
//! Stable signing interface over the Ed25519 primitive.
//!
//! - `sign` uses the locally held keypair. In [`KeyProvisioning::Lazy`]
//!   mode the keypair is created on first use and persisted through the
//!   [`KeyStorage`] port; later calls reuse it.
//! - `verify` never fails: malformed keys or signatures produce
//!   [`VerifyOutcome::Invalid`] with a [`VerifyFailure`] reason.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::StoreError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::keystore::KeyStorage;
use crate::signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::{fingerprint, CryptoError};

/// Why a signature did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyFailure {
    /// Well-formed inputs, but the signature does not match.
    InvalidSignature,
    /// Public key is not valid base64, has the wrong length, or is not a
    /// curve point.
    MalformedKey,
    /// Signature could not be decoded.
    VerifyError,
}

impl VerifyFailure {
    /// Wire/reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyFailure::InvalidSignature => "invalid-signature",
            VerifyFailure::MalformedKey => "malformed-key",
            VerifyFailure::VerifyError => "verify-error",
        }
    }
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Signature is valid for the message and key.
    Valid,
    /// Signature is not valid.
    Invalid(VerifyFailure),
}

impl VerifyOutcome {
    /// True for [`VerifyOutcome::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Valid)
    }

    /// Failure reason, if any.
    pub fn failure(&self) -> Option<VerifyFailure> {
        match self {
            VerifyOutcome::Valid => None,
            VerifyOutcome::Invalid(reason) => Some(*reason),
        }
    }
}

/// Verify a base64 signature over `message` with a base64 public key.
pub fn verify_signature(message: &[u8], signature: &str, public_key: &str) -> VerifyOutcome {
    let Ok(key) = Ed25519PublicKey::from_base64(public_key) else {
        return VerifyOutcome::Invalid(VerifyFailure::MalformedKey);
    };
    let Ok(sig) = Ed25519Signature::from_base64(signature) else {
        return VerifyOutcome::Invalid(VerifyFailure::VerifyError);
    };
    match key.verify(message, &sig) {
        Ok(()) => VerifyOutcome::Valid,
        Err(_) => VerifyOutcome::Invalid(VerifyFailure::InvalidSignature),
    }
}

/// Fingerprint of a base64 public key, `None` if it does not decode.
pub fn fingerprint_base64(public_key: &str) -> Option<String> {
    Ed25519PublicKey::from_base64(public_key)
        .ok()
        .map(|key| fingerprint(key.as_bytes()))
}

/// How the local keypair comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyProvisioning {
    /// Generate and persist a keypair on first use.
    #[default]
    Lazy,
    /// Only use a keypair already in storage.
    Existing,
}

/// Signing and verification as seen by the rest of the node.
///
/// Calls are asynchronous because key provisioning touches storage.
#[async_trait]
pub trait SignatureService: Send + Sync {
    /// Base64 public key of the local keypair.
    async fn public_key(&self) -> Result<String, CryptoError>;

    /// Sign canonical bytes, returning a base64 signature.
    async fn sign(&self, canonical: &[u8]) -> Result<String, CryptoError>;

    /// Verify a base64 signature against a base64 public key.
    async fn verify(&self, canonical: &[u8], signature: &str, public_key: &str) -> VerifyOutcome;
}

/// Ed25519 [`SignatureService`] backed by a [`KeyStorage`] collaborator.
pub struct Ed25519Signer {
    storage: Arc<dyn KeyStorage>,
    provisioning: KeyProvisioning,
    keypair: Mutex<Option<Arc<Ed25519KeyPair>>>,
}

impl Ed25519Signer {
    /// Create a signer; no storage access happens until first use.
    pub fn new(storage: Arc<dyn KeyStorage>, provisioning: KeyProvisioning) -> Self {
        Self {
            storage,
            provisioning,
            keypair: Mutex::new(None),
        }
    }

    /// Fingerprint of the local public key.
    pub async fn fingerprint(&self) -> Result<String, CryptoError> {
        let keypair = self.keypair().await?;
        Ok(fingerprint(keypair.public_key().as_bytes()))
    }

    async fn keypair(&self) -> Result<Arc<Ed25519KeyPair>, CryptoError> {
        let mut guard = self.keypair.lock().await;
        if let Some(keypair) = guard.as_ref() {
            return Ok(Arc::clone(keypair));
        }

        let keypair = Arc::new(self.load_or_create().await?);
        *guard = Some(Arc::clone(&keypair));
        Ok(keypair)
    }

    async fn load_or_create(&self) -> Result<Ed25519KeyPair, CryptoError> {
        // Only an empty slot or an unparsable keypair may be replaced.
        // Any other storage failure keeps the stored identity untouched.
        let unparsable = match self.storage.load_keypair().await {
            Ok(Some(stored)) => match Ed25519KeyPair::from_stored(&stored) {
                Ok(keypair) => return Ok(keypair),
                Err(e) => Some(e.to_string()),
            },
            Ok(None) => None,
            Err(e @ StoreError::Corrupt { .. }) => Some(e.to_string()),
            Err(e) => {
                warn!(error = %e, "Key storage unreadable");
                return Err(CryptoError::KeyUnavailable(e.to_string()));
            }
        };

        match self.provisioning {
            KeyProvisioning::Existing => Err(CryptoError::KeyUnavailable(
                unparsable.unwrap_or_else(|| "no keypair provisioned".to_string()),
            )),
            KeyProvisioning::Lazy => {
                if let Some(reason) = unparsable {
                    warn!(error = %reason, "Stored keypair unreadable, generating a new one");
                }
                let keypair = Ed25519KeyPair::generate();
                self.storage
                    .save_keypair(&keypair.to_stored())
                    .await
                    .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;
                info!(
                    fingerprint = %fingerprint(keypair.public_key().as_bytes()),
                    "Generated local signing keypair"
                );
                Ok(keypair)
            }
        }
    }
}

#[async_trait]
impl SignatureService for Ed25519Signer {
    async fn public_key(&self) -> Result<String, CryptoError> {
        Ok(self.keypair().await?.public_key().to_base64())
    }

    async fn sign(&self, canonical: &[u8]) -> Result<String, CryptoError> {
        let keypair = self.keypair().await?;
        Ok(keypair.sign(canonical).to_base64())
    }

    async fn verify(&self, canonical: &[u8], signature: &str, public_key: &str) -> VerifyOutcome {
        let outcome = verify_signature(canonical, signature, public_key);
        if let VerifyOutcome::Invalid(reason) = outcome {
            debug!(reason = %reason, "Signature did not verify");
        }
        outcome
    }
}
