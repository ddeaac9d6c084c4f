//! # Index Sync Configuration
//!
//! Bounds for publishing and per-contact synchronization.

use std::time::Duration;

use crate::domain::{
    DEFAULT_CONTACT_WORKERS, DEFAULT_FETCH_CONCURRENCY, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_MAX_ITEMS, DEFAULT_SNAPSHOT_ENTRIES,
};

/// Index sync configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Content fetches in flight per contact sync.
    pub fetch_concurrency: usize,

    /// Contacts synced at the same time by the scheduler.
    pub contact_workers: usize,

    /// Bound on each content or snapshot fetch.
    pub fetch_timeout: Duration,

    /// Bound on each content publish and head-update broadcast.
    pub publish_timeout: Duration,

    /// Entries collected per sync when the contact sets no limit.
    pub default_max_items: usize,

    /// Lookback window when the contact sets none.
    pub default_lookback: chrono::Duration,

    /// Entries written into each published snapshot.
    pub snapshot_entries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            contact_workers: DEFAULT_CONTACT_WORKERS,
            fetch_timeout: Duration::from_secs(30),
            publish_timeout: Duration::from_secs(10),
            default_max_items: DEFAULT_MAX_ITEMS,
            default_lookback: chrono::Duration::days(DEFAULT_LOOKBACK_DAYS),
            snapshot_entries: DEFAULT_SNAPSHOT_ENTRIES,
        }
    }
}

impl SyncConfig {
    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(200),
            publish_timeout: Duration::from_millis(200),
            ..Self::default()
        }
    }
}
