//! # Value Objects
//!
//! Sync bounds and the report a sync produces.

use chrono::{DateTime, Utc};
use shared_types::{Contact, Locator, SourceId};

/// Content fetches in flight per contact sync.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 3;

/// Contacts synced concurrently.
pub const DEFAULT_CONTACT_WORKERS: usize = 2;

/// Entries collected per sync.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Lookback window, about six months.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 183;

/// Entries per published snapshot.
pub const DEFAULT_SNAPSHOT_ENTRIES: usize = 100;

/// Reason recorded when a fetched item carries no signature.
pub const MISSING_SIGNATURE: &str = "missing-signature";

/// Per-call overrides for `sync_contact`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Overrides the contact's `sync_max_items`.
    pub max_items: Option<usize>,
    /// Overrides the contact's lookback window.
    pub lookback: Option<chrono::Duration>,
}

/// Effective bounds of one chain walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncBounds {
    /// Stop after this many entries.
    pub max_items: usize,
    /// Entries created before this instant are out of window.
    pub not_before: DateTime<Utc>,
}

impl SyncBounds {
    /// Resolve bounds: call options first, then contact settings, then
    /// the defaults.
    pub fn resolve(
        options: &SyncOptions,
        contact: &Contact,
        default_max_items: usize,
        default_lookback: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let max_items = options
            .max_items
            .or(contact.sync_max_items)
            .unwrap_or(default_max_items);
        let lookback = options
            .lookback
            .or_else(|| {
                contact
                    .sync_lookback_secs
                    .and_then(|secs| i64::try_from(secs).ok())
                    .map(chrono::Duration::seconds)
            })
            .unwrap_or(default_lookback);
        Self {
            max_items,
            not_before: now - lookback,
        }
    }

    /// True if an entry created at `created_at` is inside the window.
    pub fn in_window(&self, created_at: DateTime<Utc>) -> bool {
        created_at >= self.not_before
    }
}

/// Why a chain walk stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkStop {
    /// Contact has no head locator; nothing walked.
    NoHead,
    /// A sync for this contact was already running and will make one
    /// more pass; nothing walked.
    Coalesced,
    /// Reached a snapshot with no previous locator.
    ChainEnd,
    /// Collected `max_items` entries.
    MaxItems,
    /// Reached entries older than the lookback window.
    Lookback,
    /// A snapshot locator came up twice.
    Cycle,
    /// An older snapshot could not be fetched; the walk kept what it had.
    Truncated {
        /// Unreachable snapshot.
        locator: Locator,
    },
}

/// Outcome of one contact sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    /// Synced source.
    pub source_id: SourceId,
    /// Head the walk started from.
    pub head: Option<Locator>,
    /// Why the walk stopped.
    pub stop: WalkStop,
    /// Snapshots fetched.
    pub snapshots_visited: usize,
    /// In-window entries found in the chain.
    pub entries_seen: usize,
    /// Entries that were not yet present locally.
    pub new_entries: usize,
    /// Entries dropped because they name another author or reuse the id
    /// of a post that belongs to another author.
    pub rejected: usize,
    /// Items fetched and merged with a valid signature.
    pub verified: usize,
    /// Items fetched and merged without a valid signature.
    pub unverified: usize,
    /// Items stored as unavailable placeholders.
    pub placeholders: usize,
}

impl SyncReport {
    /// Report for a walk that did not start.
    pub fn empty(source_id: impl Into<SourceId>, head: Option<Locator>, stop: WalkStop) -> Self {
        Self {
            source_id: source_id.into(),
            head,
            stop,
            snapshots_visited: 0,
            entries_seen: 0,
            new_entries: 0,
            rejected: 0,
            verified: 0,
            unverified: 0,
            placeholders: 0,
        }
    }

    /// True if this call folded into a sync that was already running.
    pub fn is_coalesced(&self) -> bool {
        self.stop == WalkStop::Coalesced
    }

    /// Items written to the post store.
    pub fn merged(&self) -> usize {
        self.verified + self.unverified + self.placeholders
    }
}
