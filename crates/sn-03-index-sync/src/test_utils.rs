//! Test utilities for index sync.
//!
//! Enable with the `test-utils` feature flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_crypto::Ed25519KeyPair;
use shared_types::{Canonical, ContentEvent, HeadUpdateEvent, IndexEntry, IndexSnapshot, Locator};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::adapters::{content_locator, InMemoryContentStore};
use crate::domain::PublishError;
use crate::ports::HeadBroadcaster;

/// Sign a post with `keypair`, store it, and return its index entry.
pub fn signed_post_entry(
    store: &InMemoryContentStore,
    keypair: &Ed25519KeyPair,
    author: &str,
    id: &str,
    body: &str,
    created_at: DateTime<Utc>,
) -> IndexEntry {
    let mut event = ContentEvent::post(body, created_at);
    event.author_public_key = Some(keypair.public_key().to_base64());
    let canonical = match event.canonical_bytes() {
        Ok(bytes) => bytes,
        Err(e) => panic!("canonical encoding failed: {e}"),
    };
    event.signature = Some(keypair.sign(&canonical).to_base64());

    let bytes = match serde_json::to_vec(&event) {
        Ok(bytes) => bytes,
        Err(e) => panic!("serialization failed: {e}"),
    };
    let locator = store.insert(&content_locator(&bytes), bytes);
    IndexEntry {
        id: id.to_string(),
        author: author.to_string(),
        created_at,
        content_locator: locator,
    }
}

/// Seed a chain of `count` single-entry snapshots and return its head.
///
/// Entry `i` has id `"{author}-{i}"`, body `"post {i}"`, and is `step`
/// older than entry `i - 1`; entry 0 sits in the head snapshot at
/// `newest`.
pub fn seed_chain(
    store: &InMemoryContentStore,
    keypair: &Ed25519KeyPair,
    author: &str,
    count: usize,
    newest: DateTime<Utc>,
    step: chrono::Duration,
) -> Locator {
    let mut previous: Option<Locator> = None;
    for i in (0..count).rev() {
        let created_at = newest - step * i as i32;
        let entry = signed_post_entry(
            store,
            keypair,
            author,
            &format!("{author}-{i}"),
            &format!("post {i}"),
            created_at,
        );
        let snapshot = IndexSnapshot {
            entries: vec![entry],
            previous_snapshot_locator: previous.take(),
        };
        previous = Some(store.insert_json(&format!("snapshot:{author}:{i}"), &snapshot));
    }
    previous.unwrap_or_default()
}

/// Broadcaster that records every head update.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: parking_lot::Mutex<Vec<HeadUpdateEvent>>,
    failing: AtomicBool,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Head updates broadcast so far, in order.
    pub fn events(&self) -> Vec<HeadUpdateEvent> {
        self.events.lock().clone()
    }

    /// Make every broadcast fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl HeadBroadcaster for RecordingBroadcaster {
    async fn broadcast(&self, event: &HeadUpdateEvent) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Broadcast("no transport".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}
