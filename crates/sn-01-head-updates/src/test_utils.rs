//! Test utilities for the head-update pipeline.
//!
//! Enable with the `test-utils` feature flag.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_crypto::Ed25519KeyPair;
use shared_types::{Canonical, HeadUpdateDraft, HeadUpdateEvent, RawEvent};

use crate::ports::outbound::SyncTrigger;

/// Sync trigger that remembers every request.
#[derive(Debug, Default)]
pub struct RecordingSyncTrigger {
    requests: Mutex<Vec<String>>,
}

impl RecordingSyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source ids requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl SyncTrigger for RecordingSyncTrigger {
    fn request_sync(&self, source_id: &str) {
        self.requests.lock().push(source_id.to_string());
    }
}

/// Build and sign a head update with a local keypair.
pub fn signed_head_update(
    keypair: &Ed25519KeyPair,
    source_id: &str,
    previous_head: Option<&str>,
    new_head: &str,
    issued_at: DateTime<Utc>,
) -> HeadUpdateEvent {
    let draft = HeadUpdateDraft {
        source_id: source_id.to_string(),
        previous_head: previous_head.map(str::to_string),
        new_head: new_head.to_string(),
        item_count: None,
        last_item_timestamp: None,
        issued_at,
    };
    let mut event = draft.into_unsigned(keypair.public_key().to_base64());
    let canonical = match event.canonical_bytes() {
        Ok(bytes) => bytes,
        Err(e) => panic!("canonical encoding failed: {e}"),
    };
    event.signature = keypair.sign(&canonical).to_base64();
    event
}

/// Same as [`signed_head_update`], as the raw JSON a transport delivers.
pub fn signed_raw(
    keypair: &Ed25519KeyPair,
    source_id: &str,
    new_head: &str,
    issued_at: DateTime<Utc>,
) -> RawEvent {
    let event = signed_head_update(keypair, source_id, None, new_head, issued_at);
    match serde_json::to_value(&event) {
        Ok(raw) => raw,
        Err(e) => panic!("serialization failed: {e}"),
    }
}
