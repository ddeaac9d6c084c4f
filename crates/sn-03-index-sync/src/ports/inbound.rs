//! # Inbound Ports
//!
//! API the index subsystem offers to the runtime.

use async_trait::async_trait;
use shared_types::{HeadUpdateDraft, HeadUpdateEvent, Locator, PostRecord};

use crate::domain::{PublishError, SyncError, SyncOptions, SyncReport};

/// Consuming side: pull a contact's chain into local post state.
#[async_trait]
pub trait IndexSyncApi: Send + Sync {
    /// Walk the contact's chain and merge unseen items.
    ///
    /// A contact without a head locator yields an empty report.
    async fn sync_contact(
        &self,
        source_id: &str,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError>;
}

/// Publishing side: the local identity's chain.
#[async_trait]
pub trait IndexPublishApi: Send + Sync {
    /// Sign a head update with the local key and broadcast it.
    async fn publish_head_update(
        &self,
        draft: HeadUpdateDraft,
    ) -> Result<HeadUpdateEvent, PublishError>;

    /// Sign and store a post, then publish it with a new snapshot.
    ///
    /// The post is stored as `Pending` before anything leaves the node and
    /// ends `Committed` or `Failed`.
    async fn publish_post(&self, body: &str) -> Result<PostRecord, PublishError>;

    /// Rebuild the snapshot from local posts and publish a new head.
    async fn republish_index(&self) -> Result<HeadUpdateEvent, PublishError>;

    /// Head of the local chain.
    fn current_head(&self) -> Option<Locator>;

    /// Last head update broadcast by this node.
    fn last_published(&self) -> Option<HeadUpdateEvent>;

    /// Head updates broadcast so far.
    fn published_count(&self) -> u64;
}
