//! # Application Layer
//!
//! - [`IndexSyncService`]: per-contact sync
//! - [`IndexPublisher`]: local chain publishing
//! - [`SyncScheduler`]: worker pool feeding contacts to the sync service

pub mod publisher;
pub mod scheduler;
pub mod sync;

pub use publisher::IndexPublisher;
pub use scheduler::SyncScheduler;
pub use sync::IndexSyncService;
