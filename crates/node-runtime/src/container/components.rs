//! # Node Components
//!
//! The collaborators a node is built from. Production nodes keep posts and
//! the keypair on disk; tests swap in memory-backed adapters and an
//! in-process gossip hub.
//!
//! ```text
//! Key storage ──→ Signer ──────────────┬──→ Pipeline (1)
//! Contact registry ────────────────────┤
//! Content store ───────────────────────┼──→ Index sync / publisher (3)
//! Post store, head store ──────────────┘
//! Pub/sub node factory ───────────────────→ Transport (2)
//! ```

use shared_crypto::{InMemoryKeyStorage, KeyProvisioning, KeyStorage};
use shared_types::{Clock, SystemClock};
use sn_01_head_updates::{ContactRegistry, InMemoryContactRegistry};
use sn_02_transport::{Libp2pNodeFactory, PubSubNodeFactory};
use sn_03_index_sync::{
    ContentStore, HeadStore, InMemoryContentStore, InMemoryHeadStore, InMemoryPostStore, PostStore,
};
use std::sync::Arc;

use crate::adapters::{FsHeadStore, FsKeyStorage, FsPostStore};
use crate::container::config::NodeConfig;

/// Adapters implementing every outbound port of the node.
#[derive(Clone)]
pub struct NodeComponents {
    pub key_storage: Arc<dyn KeyStorage>,
    pub provisioning: KeyProvisioning,
    pub contacts: Arc<dyn ContactRegistry>,
    pub content: Arc<dyn ContentStore>,
    pub posts: Arc<dyn PostStore>,
    pub head_store: Arc<dyn HeadStore>,
    pub node_factory: Arc<dyn PubSubNodeFactory>,
    pub clock: Arc<dyn Clock>,
}

impl NodeComponents {
    /// File-backed posts, keypair and head under `storage.data_dir`, libp2p gossip.
    ///
    /// The content store is process-local until a networked store exists.
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            key_storage: Arc::new(FsKeyStorage::new(config.storage.keypair_path())),
            provisioning: KeyProvisioning::Lazy,
            contacts: Arc::new(InMemoryContactRegistry::with_contacts(
                config.initial_contacts(),
            )),
            content: Arc::new(InMemoryContentStore::new()),
            posts: Arc::new(FsPostStore::new(config.storage.posts_dir())),
            head_store: Arc::new(FsHeadStore::new(config.storage.head_path())),
            node_factory: Arc::new(Libp2pNodeFactory::new(&config.transport_config())),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Everything in memory, sharing `content` and `node_factory` with
    /// other nodes in the same process.
    pub fn in_memory(
        content: Arc<dyn ContentStore>,
        node_factory: Arc<dyn PubSubNodeFactory>,
    ) -> Self {
        Self {
            key_storage: Arc::new(InMemoryKeyStorage::new()),
            provisioning: KeyProvisioning::Lazy,
            contacts: Arc::new(InMemoryContactRegistry::new()),
            content,
            posts: Arc::new(InMemoryPostStore::new()),
            head_store: Arc::new(InMemoryHeadStore::new()),
            node_factory,
            clock: Arc::new(SystemClock::new()),
        }
    }

    pub fn with_contacts(mut self, contacts: Arc<dyn ContactRegistry>) -> Self {
        self.contacts = contacts;
        self
    }

    pub fn with_posts(mut self, posts: Arc<dyn PostStore>) -> Self {
        self.posts = posts;
        self
    }

    pub fn with_head_store(mut self, head_store: Arc<dyn HeadStore>) -> Self {
        self.head_store = head_store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_key_storage(
        mut self,
        key_storage: Arc<dyn KeyStorage>,
        provisioning: KeyProvisioning,
    ) -> Self {
        self.key_storage = key_storage;
        self.provisioning = provisioning;
        self
    }
}
