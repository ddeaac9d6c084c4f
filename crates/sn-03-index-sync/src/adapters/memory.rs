//! # In-Memory Adapters
//!
//! Content store and post store kept in process memory. The content
//! store derives locators from the content hash and supports injected
//! failures and delays per locator.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{Locator, PostRecord, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::ContentStoreError;
use crate::ports::{ContentStore, HeadStore, PostStore};

/// Locator scheme of the in-memory content store.
pub const LOCATOR_PREFIX: &str = "sn:sha256:";

/// Locator for `bytes`.
pub fn content_locator(bytes: &[u8]) -> Locator {
    format!("{LOCATOR_PREFIX}{}", hex::encode(Sha256::digest(bytes)))
}

#[derive(Default)]
struct ContentState {
    blobs: HashMap<Locator, Arc<Vec<u8>>>,
    failing: HashSet<Locator>,
    delays: HashMap<Locator, Duration>,
    fetched: Vec<Locator>,
    fail_publish: bool,
}

/// Content-addressed store held in memory.
///
/// Clones share the same blobs, so several nodes in one process can
/// exchange content through it.
#[derive(Clone, Default)]
pub struct InMemoryContentStore {
    state: Arc<RwLock<ContentState>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under an explicit locator.
    pub fn insert(&self, locator: &str, bytes: Vec<u8>) -> Locator {
        self.state
            .write()
            .blobs
            .insert(locator.to_string(), Arc::new(bytes));
        locator.to_string()
    }

    /// Store a JSON record under an explicit locator.
    pub fn insert_json<T: Serialize>(&self, locator: &str, value: &T) -> Locator {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        self.insert(locator, bytes)
    }

    /// Make fetches of `locator` fail.
    pub fn fail(&self, locator: &str) {
        self.state.write().failing.insert(locator.to_string());
    }

    /// Delay fetches of `locator`.
    pub fn delay(&self, locator: &str, delay: Duration) {
        self.state.write().delays.insert(locator.to_string(), delay);
    }

    /// Make every publish fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.state.write().fail_publish = fail;
    }

    /// Locators requested so far, in order.
    pub fn fetched(&self) -> Vec<Locator> {
        self.state.read().fetched.clone()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.state.read().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn publish(&self, bytes: Vec<u8>, filename: &str) -> Result<Locator, ContentStoreError> {
        if self.state.read().fail_publish {
            return Err(ContentStoreError::PublishFailed {
                filename: filename.to_string(),
                reason: "content store offline".to_string(),
            });
        }
        let locator = content_locator(&bytes);
        Ok(self.insert(&locator, bytes))
    }

    async fn fetch(&self, locator: &str, timeout: Duration) -> Result<Vec<u8>, ContentStoreError> {
        let (delay, failing) = {
            let mut state = self.state.write();
            state.fetched.push(locator.to_string());
            (
                state.delays.get(locator).copied(),
                state.failing.contains(locator),
            )
        };

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ContentStoreError::Timeout {
                    locator: locator.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(ContentStoreError::FetchFailed {
                locator: locator.to_string(),
                reason: "no peers serving content".to_string(),
            });
        }

        self.state
            .read()
            .blobs
            .get(locator)
            .map(|bytes| bytes.as_ref().clone())
            .ok_or_else(|| ContentStoreError::FetchFailed {
                locator: locator.to_string(),
                reason: "not found".to_string(),
            })
    }
}

/// Post store held in memory.
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: RwLock<HashMap<String, PostRecord>>,
    fail_writes: RwLock<bool>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post by id.
    pub fn get(&self, id: &str) -> Option<PostRecord> {
        self.posts.read().get(id).cloned()
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every write fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write() = fail;
    }
}

/// Newest first, id as tie-break.
pub fn sort_newest_first(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn upsert_many(&self, posts: &[PostRecord]) -> Result<(), StoreError> {
        if *self.fail_writes.read() {
            return Err(StoreError::Io("post store read-only".to_string()));
        }
        let mut stored = self.posts.write();
        for post in posts {
            stored.insert(post.id.clone(), post.clone());
        }
        Ok(())
    }

    async fn list_by_author(&self, author: &str) -> Result<Vec<PostRecord>, StoreError> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .read()
            .values()
            .filter(|post| post.author == author)
            .cloned()
            .collect();
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn find(&self, id: &str) -> Result<Option<PostRecord>, StoreError> {
        Ok(self.get(id))
    }
}

/// Head slot held in memory. Clones share the slot.
#[derive(Clone, Default)]
pub struct InMemoryHeadStore {
    head: Arc<RwLock<Option<Locator>>>,
}

impl InMemoryHeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-populated with `head`.
    pub fn with_head(head: impl Into<Locator>) -> Self {
        Self {
            head: Arc::new(RwLock::new(Some(head.into()))),
        }
    }

    pub fn head(&self) -> Option<Locator> {
        self.head.read().clone()
    }
}

#[async_trait]
impl HeadStore for InMemoryHeadStore {
    async fn load_head(&self) -> Result<Option<Locator>, StoreError> {
        Ok(self.head())
    }

    async fn save_head(&self, head: &Locator) -> Result<(), StoreError> {
        *self.head.write() = Some(head.clone());
        Ok(())
    }
}
