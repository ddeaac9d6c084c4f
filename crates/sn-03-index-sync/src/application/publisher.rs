//! # Index Publisher
//!
//! Publishing side of the local identity's index chain.
//!
//! ## Post Lifecycle
//!
//! ```text
//! publish_post(body)
//!   sign ContentEvent ──→ store as Pending
//!                             │
//!   publish content ──→ rebuild snapshot ──→ publish snapshot
//!                             │
//!   sign HeadUpdateEvent ──→ broadcast ──→ store as Committed
//!
//!   any failure after Pending ──→ store as Failed { reason }
//! ```
//!
//! Publishes are serialized so each snapshot links to the head produced
//! by the one before it. The local head only moves after the head update
//! was broadcast. With a [`HeadStore`] attached, the head is saved after
//! every publish and restored before the first one, so a restarted node
//! keeps extending the same chain.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_crypto::{fingerprint_base64, SignatureService};
use shared_types::{
    parse_timestamp, Availability, Canonical, Clock, ContentEvent, HeadUpdateDraft,
    HeadUpdateEvent, Locator, PostRecord, PublishState, SourceId, StoreError,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::algorithms::build_snapshot;
use crate::config::SyncConfig;
use crate::domain::PublishError;
use crate::ports::{ContentStore, HeadBroadcaster, HeadStore, IndexPublishApi, PostStore};

/// Publishes posts, snapshots and head updates for one identity.
pub struct IndexPublisher {
    config: SyncConfig,
    source_id: SourceId,
    signer: Arc<dyn SignatureService>,
    content: Arc<dyn ContentStore>,
    posts: Arc<dyn PostStore>,
    broadcaster: Arc<dyn HeadBroadcaster>,
    clock: Arc<dyn Clock>,
    head: Mutex<Option<Locator>>,
    head_store: Option<Arc<dyn HeadStore>>,
    head_restored: AtomicBool,
    publish_lock: tokio::sync::Mutex<()>,
    last_published: Mutex<Option<HeadUpdateEvent>>,
    published: AtomicU64,
}

impl IndexPublisher {
    pub fn new(
        config: SyncConfig,
        source_id: impl Into<SourceId>,
        signer: Arc<dyn SignatureService>,
        content: Arc<dyn ContentStore>,
        posts: Arc<dyn PostStore>,
        broadcaster: Arc<dyn HeadBroadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            source_id: source_id.into(),
            signer,
            content,
            posts,
            broadcaster,
            clock,
            head: Mutex::new(None),
            head_store: None,
            head_restored: AtomicBool::new(false),
            publish_lock: tokio::sync::Mutex::new(()),
            last_published: Mutex::new(None),
            published: AtomicU64::new(0),
        }
    }

    /// Continue an existing chain from `head`.
    pub fn with_head(self, head: Option<Locator>) -> Self {
        *self.head.lock() = head;
        self.head_restored.store(true, Ordering::Release);
        self
    }

    /// Persist the head in `store` and continue the chain it holds.
    pub fn with_head_store(mut self, store: Arc<dyn HeadStore>) -> Self {
        self.head_store = Some(store);
        self
    }

    /// Load the persisted head if that has not happened yet. Returns the
    /// current head.
    pub async fn restore_head(&self) -> Result<Option<Locator>, StoreError> {
        let _guard = self.publish_lock.lock().await;
        self.restore_head_locked().await
    }

    async fn restore_head_locked(&self) -> Result<Option<Locator>, StoreError> {
        if let Some(store) = &self.head_store {
            if !self.head_restored.load(Ordering::Acquire) {
                if let Some(head) = store.load_head().await? {
                    info!(head = %head, "Local index head restored");
                    *self.head.lock() = Some(head);
                }
                self.head_restored.store(true, Ordering::Release);
            }
        }
        Ok(self.head.lock().clone())
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Sign a draft with the local key without broadcasting it.
    pub async fn sign_head_update(
        &self,
        draft: HeadUpdateDraft,
    ) -> Result<HeadUpdateEvent, PublishError> {
        let public_key = self.signer.public_key().await?;
        let mut event = draft.into_unsigned(public_key);
        let canonical = event.canonical_bytes()?;
        event.signature = self.signer.sign(&canonical).await?;
        Ok(event)
    }

    async fn with_timeout<T, F>(&self, step: &'static str, fut: F) -> Result<T, PublishError>
    where
        F: Future<Output = Result<T, PublishError>>,
    {
        match tokio::time::timeout(self.config.publish_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout {
                step,
                timeout_ms: self.config.publish_timeout.as_millis() as u64,
            }),
        }
    }

    async fn publish_blob(&self, bytes: Vec<u8>, filename: &str) -> Result<Locator, PublishError> {
        self.with_timeout("content publish", async {
            Ok(self.content.publish(bytes, filename).await?)
        })
        .await
    }

    async fn broadcast(&self, event: &HeadUpdateEvent) -> Result<(), PublishError> {
        self.with_timeout("broadcast", self.broadcaster.broadcast(event))
            .await?;
        self.published.fetch_add(1, Ordering::Relaxed);
        *self.last_published.lock() = Some(event.clone());
        info!(
            source_id = %event.source_id,
            new_head = %event.new_head,
            item_count = ?event.item_count,
            "Head update published"
        );
        Ok(())
    }

    /// Rebuild, publish and announce the snapshot. Caller holds
    /// `publish_lock`.
    async fn publish_snapshot(&self) -> Result<HeadUpdateEvent, PublishError> {
        let previous = self.restore_head_locked().await?;
        let posts = self.posts.list_by_author(&self.source_id).await?;
        let snapshot = build_snapshot(&posts, previous.clone(), self.config.snapshot_entries);

        let now = self.clock.now();
        let bytes = serde_json::to_vec(&snapshot)?;
        let filename = format!("index-{}.json", now.timestamp_millis());
        let new_head = self.publish_blob(bytes, &filename).await?;
        debug!(
            locator = %new_head,
            entries = snapshot.entries.len(),
            "Index snapshot published"
        );

        let draft = HeadUpdateDraft {
            source_id: self.source_id.clone(),
            previous_head: previous,
            new_head: new_head.clone(),
            item_count: Some(snapshot.entries.len() as u64),
            last_item_timestamp: snapshot.entries.first().map(|entry| entry.created_at),
            issued_at: now,
        };
        let event = self.sign_head_update(draft).await?;
        self.broadcast(&event).await?;
        *self.head.lock() = Some(new_head.clone());
        if let Some(store) = &self.head_store {
            if let Err(e) = store.save_head(&new_head).await {
                warn!(head = %new_head, error = %e, "Failed to persist local index head");
            }
        }
        Ok(event)
    }

    async fn commit_post(
        &self,
        record: &mut PostRecord,
        event: &ContentEvent,
    ) -> Result<HeadUpdateEvent, PublishError> {
        let bytes = serde_json::to_vec(event)?;
        let locator = self
            .publish_blob(bytes, &format!("post-{}.json", record.id))
            .await?;
        record.content_locator = Some(locator);
        self.posts
            .upsert_many(std::slice::from_ref(record))
            .await?;
        self.publish_snapshot().await
    }
}

#[async_trait]
impl IndexPublishApi for IndexPublisher {
    async fn publish_head_update(
        &self,
        draft: HeadUpdateDraft,
    ) -> Result<HeadUpdateEvent, PublishError> {
        let event = self.sign_head_update(draft).await?;
        self.broadcast(&event).await?;
        Ok(event)
    }

    async fn publish_post(&self, body: &str) -> Result<PostRecord, PublishError> {
        let _guard = self.publish_lock.lock().await;

        let public_key = self.signer.public_key().await?;
        let mut event = ContentEvent::post(body, self.clock.now());
        event.author_public_key = Some(public_key.clone());
        let canonical = event.canonical_bytes()?;
        event.signature = Some(self.signer.sign(&canonical).await?);

        let mut record = PostRecord {
            id: uuid::Uuid::new_v4().to_string(),
            author: self.source_id.clone(),
            content: event.body.clone(),
            created_at: parse_timestamp(&event.created_at).unwrap_or_else(|| self.clock.now()),
            attachments: event.attachments.clone(),
            signature: event.signature.clone(),
            fingerprint: fingerprint_base64(&public_key),
            author_public_key: Some(public_key),
            content_locator: None,
            signature_verified: Some(true),
            signature_error: None,
            availability: Availability::Available,
            publish_state: Some(PublishState::Pending),
        };
        self.posts
            .upsert_many(std::slice::from_ref(&record))
            .await?;
        debug!(id = %record.id, "Post stored, publishing");

        match self.commit_post(&mut record, &event).await {
            Ok(head) => {
                record.publish_state = Some(PublishState::Committed);
                self.posts
                    .upsert_many(std::slice::from_ref(&record))
                    .await?;
                info!(id = %record.id, head = %head.new_head, "Post published");
                Ok(record)
            }
            Err(e) => {
                warn!(id = %record.id, error = %e, "Post publish failed");
                record.publish_state = Some(PublishState::Failed {
                    reason: e.to_string(),
                });
                if let Err(store_err) = self.posts.upsert_many(std::slice::from_ref(&record)).await
                {
                    warn!(id = %record.id, error = %store_err, "Failed to record publish failure");
                }
                Err(e)
            }
        }
    }

    async fn republish_index(&self) -> Result<HeadUpdateEvent, PublishError> {
        let _guard = self.publish_lock.lock().await;
        self.publish_snapshot().await
    }

    fn current_head(&self) -> Option<Locator> {
        self.head.lock().clone()
    }

    fn last_published(&self) -> Option<HeadUpdateEvent> {
        self.last_published.lock().clone()
    }

    fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
