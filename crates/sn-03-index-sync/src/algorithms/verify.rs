//! # Content Verification
//!
//! Turns a fetched content blob into a post record. The signature is
//! checked over the canonical encoding of the fields as fetched. Items
//! that fail verification are kept and marked, never dropped.

use shared_crypto::{fingerprint_base64, SignatureService, VerifyFailure, VerifyOutcome};
use shared_types::{canonicalize_value, Availability, Canonical, ContentEvent, IndexEntry, PostRecord};

use crate::domain::MISSING_SIGNATURE;

/// Signature status of a fetched item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentVerdict {
    /// Signature valid for the embedded public key.
    Verified,
    /// No valid signature; carries the reason.
    Unverified(String),
}

async fn check_signature(
    raw: &serde_json::Value,
    event: &ContentEvent,
    verifier: &dyn SignatureService,
) -> ContentVerdict {
    let signature = match event.signature.as_deref() {
        Some(signature) if !signature.is_empty() => signature,
        _ => return ContentVerdict::Unverified(MISSING_SIGNATURE.to_string()),
    };
    let Some(public_key) = event.author_public_key.as_deref() else {
        return ContentVerdict::Unverified(VerifyFailure::MalformedKey.as_str().to_string());
    };
    let Ok(canonical) = canonicalize_value(raw, ContentEvent::FIELD_ORDER) else {
        return ContentVerdict::Unverified(VerifyFailure::VerifyError.as_str().to_string());
    };
    match verifier.verify(&canonical, signature, public_key).await {
        VerifyOutcome::Valid => ContentVerdict::Verified,
        VerifyOutcome::Invalid(failure) => ContentVerdict::Unverified(failure.as_str().to_string()),
    }
}

/// Decode `bytes` as a content event for `entry` and verify it.
///
/// Returns the failure reason if the blob is not a content event; the
/// caller stores a placeholder in that case.
pub async fn verified_record(
    entry: &IndexEntry,
    bytes: &[u8],
    verifier: &dyn SignatureService,
) -> Result<(PostRecord, ContentVerdict), String> {
    let raw: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| format!("undecodable content: {e}"))?;
    let event: ContentEvent =
        serde_json::from_value(raw.clone()).map_err(|e| format!("not a content event: {e}"))?;

    let verdict = check_signature(&raw, &event, verifier).await;
    let (signature_verified, signature_error) = match &verdict {
        ContentVerdict::Verified => (true, None),
        ContentVerdict::Unverified(reason) => (false, Some(reason.clone())),
    };
    let fingerprint = event.author_public_key.as_deref().and_then(fingerprint_base64);

    let record = PostRecord {
        id: entry.id.clone(),
        author: entry.author.clone(),
        content: event.body,
        created_at: entry.created_at,
        attachments: event.attachments,
        signature: event.signature,
        author_public_key: event.author_public_key,
        content_locator: Some(entry.content_locator.clone()),
        signature_verified: Some(signature_verified),
        signature_error,
        fingerprint,
        availability: Availability::Available,
        publish_state: None,
    };
    Ok((record, verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_crypto::{Ed25519KeyPair, Ed25519Signer, InMemoryKeyStorage, KeyProvisioning};
    use std::sync::Arc;

    fn entry() -> IndexEntry {
        IndexEntry {
            id: "p1".to_string(),
            author: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            content_locator: "sn:sha256:00".to_string(),
        }
    }

    fn verifier() -> Ed25519Signer {
        Ed25519Signer::new(Arc::new(InMemoryKeyStorage::new()), KeyProvisioning::Existing)
    }

    fn signed_post(keypair: &Ed25519KeyPair, body: &str) -> ContentEvent {
        let mut event = ContentEvent::post(body, entry().created_at);
        event.author_public_key = Some(keypair.public_key().to_base64());
        let canonical = event.canonical_bytes().unwrap();
        event.signature = Some(keypair.sign(&canonical).to_base64());
        event
    }

    #[tokio::test]
    async fn test_signed_item_verified() {
        let keypair = Ed25519KeyPair::generate();
        let bytes = serde_json::to_vec(&signed_post(&keypair, "hello")).unwrap();

        let (record, verdict) = verified_record(&entry(), &bytes, &verifier()).await.unwrap();

        assert_eq!(verdict, ContentVerdict::Verified);
        assert_eq!(record.content, "hello");
        assert_eq!(record.signature_verified, Some(true));
        assert!(record.fingerprint.unwrap().starts_with("fpr-"));
    }

    #[tokio::test]
    async fn test_tampered_item_kept_but_marked() {
        let keypair = Ed25519KeyPair::generate();
        let mut event = signed_post(&keypair, "hello");
        event.body = "goodbye".to_string();
        let bytes = serde_json::to_vec(&event).unwrap();

        let (record, verdict) = verified_record(&entry(), &bytes, &verifier()).await.unwrap();

        assert_eq!(verdict, ContentVerdict::Unverified("invalid-signature".to_string()));
        assert_eq!(record.content, "goodbye");
        assert_eq!(record.signature_verified, Some(false));
        assert_eq!(record.signature_error.as_deref(), Some("invalid-signature"));
    }

    #[tokio::test]
    async fn test_unsigned_item_marked_missing_signature() {
        let bytes = serde_json::to_vec(&ContentEvent::post("anon", entry().created_at)).unwrap();

        let (record, _) = verified_record(&entry(), &bytes, &verifier()).await.unwrap();

        assert_eq!(record.signature_verified, Some(false));
        assert_eq!(record.signature_error.as_deref(), Some(MISSING_SIGNATURE));
        assert!(!record.is_placeholder());
    }

    #[tokio::test]
    async fn test_garbage_is_an_error() {
        assert!(verified_record(&entry(), b"not json", &verifier()).await.is_err());
        assert!(verified_record(&entry(), b"{\"x\":1}", &verifier()).await.is_err());
    }
}
