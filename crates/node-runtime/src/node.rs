//! # SnartNet Node
//!
//! Wires the three subsystems together and exposes the application API.
//!
//! ## Wiring
//!
//! ```text
//!            publish_post / publish_head_update
//!                          │
//!                          ↓
//!  [Index Publisher (3)] ──broadcast──→ [Transport (2)]
//!                                            │ inbound pump
//!                                            ↓
//!                                 [Head-Update Pipeline (1)]
//!                                            │ apply → request_sync
//!                                            ↓
//!                 [Sync Scheduler] ──workers──→ [Index Sync (3)]
//! ```
//!
//! The transport starts on the first call to [`SnartnetNode::start_transport`]
//! or the first broadcast, whichever comes first.

use shared_bus::Subscription;
use shared_crypto::{CryptoError, Ed25519Signer, SignatureService};
use shared_types::{HeadUpdateDraft, HeadUpdateEvent, Locator, PostRecord, StoreError};
use sn_01_head_updates::{
    AcceptedHeadUpdate, ContactRegistry, HeadUpdateApi, HeadUpdatePipeline, PipelineStats,
};
use sn_02_transport::TransportKind;
use sn_03_index_sync::{
    IndexPublishApi, IndexPublisher, IndexSyncApi, IndexSyncService, PostStore, PublishError,
    SyncError, SyncOptions, SyncReport, SyncScheduler,
};
use std::sync::Arc;
use tracing::info;

use crate::adapters::{TransportBroadcaster, TransportHandle};
use crate::container::{NodeComponents, NodeConfig};

/// A running SnartNet node.
///
/// Must be created inside a Tokio runtime; sync workers are spawned on
/// construction.
pub struct SnartnetNode {
    config: NodeConfig,
    signer: Arc<Ed25519Signer>,
    contacts: Arc<dyn ContactRegistry>,
    posts: Arc<dyn PostStore>,
    pipeline: Arc<HeadUpdatePipeline>,
    transport: Arc<TransportHandle>,
    sync: Arc<IndexSyncService>,
    scheduler: Arc<SyncScheduler>,
    publisher: Arc<IndexPublisher>,
}

impl SnartnetNode {
    pub fn new(config: NodeConfig, components: NodeComponents) -> Self {
        let sync_config = config.sync_config();
        let NodeComponents {
            key_storage,
            provisioning,
            contacts,
            content,
            posts,
            head_store,
            node_factory,
            clock,
        } = components;

        let signer = Arc::new(Ed25519Signer::new(key_storage, provisioning));

        let sync = Arc::new(IndexSyncService::new(
            sync_config.clone(),
            Arc::clone(&content),
            Arc::clone(&posts),
            Arc::clone(&contacts),
            signer.clone(),
            Arc::clone(&clock),
        ));
        let scheduler = Arc::new(SyncScheduler::start(
            sync.clone(),
            Arc::clone(&contacts),
            sync_config.contact_workers,
        ));

        let pipeline = Arc::new(HeadUpdatePipeline::new(
            config.pipeline_config(),
            signer.clone(),
            Arc::clone(&contacts),
            scheduler.clone(),
            Arc::clone(&clock),
        ));
        let transport = Arc::new(TransportHandle::new(
            config.transport_config(),
            node_factory,
            pipeline.clone(),
        ));

        let publisher = Arc::new(IndexPublisher::new(
            sync_config,
            config.identity.source_id.clone(),
            signer.clone(),
            content,
            Arc::clone(&posts),
            Arc::new(TransportBroadcaster::new(Arc::clone(&transport))),
            clock,
        )
        .with_head_store(head_store));

        Self {
            config,
            signer,
            contacts,
            posts,
            pipeline,
            transport,
            sync,
            scheduler,
            publisher,
        }
    }

    /// Local publishing identity.
    pub fn source_id(&self) -> &str {
        &self.config.identity.source_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Base64 public key, provisioning the keypair if needed.
    pub async fn public_key(&self) -> Result<String, CryptoError> {
        self.signer.public_key().await
    }

    /// Display fingerprint of the local key.
    pub async fn fingerprint(&self) -> Result<String, CryptoError> {
        self.signer.fingerprint().await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Select and start the configured transport. Idempotent.
    pub async fn start_transport(&self) -> TransportKind {
        self.transport.get_or_start().await.kind()
    }

    /// Kind of the started transport, `None` before start.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        self.transport.current().map(|t| t.kind())
    }

    // =========================================================================
    // Head updates
    // =========================================================================

    /// Sign `draft` with the local key and broadcast it.
    pub async fn publish_head_update(
        &self,
        draft: HeadUpdateDraft,
    ) -> Result<HeadUpdateEvent, PublishError> {
        self.publisher.publish_head_update(draft).await
    }

    /// Accepted inbound head updates, in processing order.
    pub fn on_head_update(&self) -> Subscription<AcceptedHeadUpdate> {
        self.pipeline.subscribe_accepted()
    }

    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Sign, store and publish a post; returns the final record.
    pub async fn publish_post(&self, body: &str) -> Result<PostRecord, PublishError> {
        self.publisher.publish_post(body).await
    }

    /// Publish a fresh snapshot of local posts under a new head.
    pub async fn republish_index(&self) -> Result<HeadUpdateEvent, PublishError> {
        self.publisher.republish_index().await
    }

    pub fn current_head(&self) -> Option<Locator> {
        self.publisher.current_head()
    }

    /// Load the head persisted by a previous run. Publishing does this
    /// on its own; call it at startup to see the head before that.
    pub async fn restore_head(&self) -> Result<Option<Locator>, StoreError> {
        self.publisher.restore_head().await
    }

    pub fn last_published(&self) -> Option<HeadUpdateEvent> {
        self.publisher.last_published()
    }

    pub fn published_count(&self) -> u64 {
        self.publisher.published_count()
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Sync one contact now and wait for the result.
    pub async fn sync_contact(
        &self,
        source_id: &str,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        self.sync.sync_contact(source_id, options).await
    }

    /// Queue a background sync of one contact.
    pub fn request_sync(&self, source_id: &str) -> bool {
        self.scheduler.enqueue(source_id)
    }

    /// Queue every contact with a known head. Returns how many were queued.
    pub async fn sync_all_contacts(&self) -> Result<usize, SyncError> {
        self.scheduler.sync_all_contacts().await
    }

    /// Background syncs finished so far.
    pub fn syncs_completed(&self) -> u64 {
        self.scheduler.completed()
    }

    pub fn contacts(&self) -> &Arc<dyn ContactRegistry> {
        &self.contacts
    }

    /// Stored posts of `author`, newest first.
    pub async fn posts_by_author(&self, author: &str) -> Result<Vec<PostRecord>, StoreError> {
        self.posts.list_by_author(author).await
    }

    /// Stop sync workers, the inbound pump and the transport.
    pub async fn shutdown(&self) {
        info!(source_id = %self.source_id(), "Shutting down node");
        self.scheduler.shutdown();
        self.transport.shutdown().await;
    }
}
