//! # Outbound Ports
//!
//! Collaborators the index subsystem depends on but does not implement.
//! Contacts are read through [`sn_01_head_updates::ContactRegistry`].

use async_trait::async_trait;
use shared_types::{HeadUpdateEvent, Locator, PostRecord, StoreError};
use std::time::Duration;

use crate::domain::{ContentStoreError, PublishError};

/// Content-addressed blob store (seeding/retrieval engine).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return the locator peers fetch them by.
    async fn publish(&self, bytes: Vec<u8>, filename: &str) -> Result<Locator, ContentStoreError>;

    /// Retrieve the blob behind `locator`, giving up after `timeout`.
    async fn fetch(&self, locator: &str, timeout: Duration) -> Result<Vec<u8>, ContentStoreError>;
}

/// Local post state.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert or replace posts by id.
    async fn upsert_many(&self, posts: &[PostRecord]) -> Result<(), StoreError>;

    /// All posts by `author`, newest first.
    async fn list_by_author(&self, author: &str) -> Result<Vec<PostRecord>, StoreError>;

    /// Post with `id`, whoever wrote it.
    async fn find(&self, id: &str) -> Result<Option<PostRecord>, StoreError>;
}

/// Durable slot for the head of the local chain.
#[async_trait]
pub trait HeadStore: Send + Sync {
    /// Last persisted head, `None` before the first publish.
    async fn load_head(&self) -> Result<Option<Locator>, StoreError>;

    /// Replace the persisted head.
    async fn save_head(&self, head: &Locator) -> Result<(), StoreError>;
}

/// Sends signed head updates to peers.
#[async_trait]
pub trait HeadBroadcaster: Send + Sync {
    async fn broadcast(&self, event: &HeadUpdateEvent) -> Result<(), PublishError>;
}
