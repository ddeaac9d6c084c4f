//! # Index Sync Subsystem (sn-03)
//!
//! Publishes the local identity's post-index chain and pulls contacts'
//! chains into local post state.
//!
//! ## Index Chain
//!
//! ```text
//! head ──→ IndexSnapshot { entries, previous } ──→ IndexSnapshot ──→ … ──→ none
//!                  │
//!                  └─ IndexEntry { id, author, createdAt, contentLocator }
//! ```
//!
//! Snapshots and content are stored in a content-addressed store and
//! referenced by locator. A signed head update announces each new head.
//!
//! ## Failure Handling
//!
//! | Failure | Result |
//! |---------|--------|
//! | Head snapshot unreachable | `SyncError::IndexUnavailable` |
//! | Older snapshot unreachable | Walk truncated, sync continues |
//! | Content fetch fails or times out | Placeholder post, sync continues |
//! | Content signature invalid or missing | Post kept, marked unverified |
//! | No local keypair | `PublishError::Crypto(KeyUnavailable)` |
//!
//! ## Module Structure
//!
//! ```text
//! sn-03-index-sync/
//! ├── domain/        # Bounds, reports, errors
//! ├── algorithms/    # Chain walk, snapshot building, content verification
//! ├── ports/         # Sync/publish APIs + content, post and head stores, broadcaster
//! ├── application/   # IndexSyncService, IndexPublisher, SyncScheduler
//! ├── adapters/      # In-memory content, post and head stores
//! └── config.rs      # SyncConfig
//! ```

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{InMemoryContentStore, InMemoryHeadStore, InMemoryPostStore};
pub use application::{IndexPublisher, IndexSyncService, SyncScheduler};
pub use config::SyncConfig;
pub use domain::*;
pub use ports::{
    ContentStore, HeadBroadcaster, HeadStore, IndexPublishApi, IndexSyncApi, PostStore,
};
