//! # Index Sync Service
//!
//! Pulls a contact's index chain into local post state.
//!
//! ## Flow
//!
//! 1. Read the contact; no head locator means nothing to do
//! 2. Bounded chain walk from the head (see [`walk_chain`])
//! 3. Drop entries that name another author or reuse the id of another
//!    author's post, and entries already stored locally (placeholders are
//!    retried)
//! 4. Fetch the rest in batches of `fetch_concurrency`, each fetch with
//!    its own timeout
//! 5. Verify each item; failed fetches become placeholders
//! 6. Merge newest first into the post store
//!
//! At most one sync per contact runs at a time. A trigger that arrives
//! while one is running returns a [`WalkStop::Coalesced`] report and the
//! running sync makes one more pass, so a head that moved mid-sync is
//! still picked up.

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use shared_crypto::SignatureService;
use shared_types::{Clock, IndexEntry, PostRecord, SourceId};
use sn_01_head_updates::ContactRegistry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::sort_newest_first;
use crate::algorithms::{fetch_with_timeout, verified_record, walk_chain, ContentVerdict};
use crate::config::SyncConfig;
use crate::domain::{SyncBounds, SyncError, SyncOptions, SyncReport, WalkStop};
use crate::ports::{ContentStore, IndexSyncApi, PostStore};

/// Syncs held per contact. `true` means another pass was requested.
type InFlight = Mutex<HashMap<SourceId, bool>>;

/// Claim on a contact's sync slot. Releases the slot when dropped.
struct SyncSlot<'a> {
    in_flight: &'a InFlight,
    source_id: String,
    released: bool,
}

impl<'a> SyncSlot<'a> {
    fn claim(in_flight: &'a InFlight, source_id: &str) -> Option<Self> {
        let mut map = in_flight.lock();
        if let Some(rerun) = map.get_mut(source_id) {
            *rerun = true;
            return None;
        }
        map.insert(source_id.to_string(), false);
        Some(Self {
            in_flight,
            source_id: source_id.to_string(),
            released: false,
        })
    }

    /// Release the slot unless another pass was requested meanwhile.
    /// Returns `true` if the caller should run again.
    fn release_or_rerun(&mut self) -> bool {
        let mut map = self.in_flight.lock();
        match map.get_mut(&self.source_id) {
            Some(rerun) if *rerun => {
                *rerun = false;
                true
            }
            _ => {
                map.remove(&self.source_id);
                self.released = true;
                false
            }
        }
    }
}

impl Drop for SyncSlot<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.in_flight.lock().remove(&self.source_id);
        }
    }
}

/// Per-contact index sync.
pub struct IndexSyncService {
    config: SyncConfig,
    content: Arc<dyn ContentStore>,
    posts: Arc<dyn PostStore>,
    contacts: Arc<dyn ContactRegistry>,
    verifier: Arc<dyn SignatureService>,
    clock: Arc<dyn Clock>,
    in_flight: InFlight,
}

impl IndexSyncService {
    pub fn new(
        config: SyncConfig,
        content: Arc<dyn ContentStore>,
        posts: Arc<dyn PostStore>,
        contacts: Arc<dyn ContactRegistry>,
        verifier: Arc<dyn SignatureService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            content,
            posts,
            contacts,
            verifier,
            clock,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// True while a sync for `source_id` is running.
    pub fn is_syncing(&self, source_id: &str) -> bool {
        self.in_flight.lock().contains_key(source_id)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch and verify one entry. `None` verdict means placeholder.
    async fn fetch_entry(&self, entry: &IndexEntry) -> (PostRecord, Option<ContentVerdict>) {
        let bytes = match fetch_with_timeout(
            self.content.as_ref(),
            &entry.content_locator,
            self.config.fetch_timeout,
        )
        .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    id = %entry.id,
                    locator = %entry.content_locator,
                    error = %e,
                    "Content fetch failed, storing placeholder"
                );
                return (PostRecord::placeholder(entry, e.to_string()), None);
            }
        };

        match verified_record(entry, &bytes, self.verifier.as_ref()).await {
            Ok((record, verdict)) => {
                if let ContentVerdict::Unverified(reason) = &verdict {
                    debug!(id = %entry.id, reason = %reason, "Content signature not verified");
                }
                (record, Some(verdict))
            }
            Err(reason) => {
                warn!(id = %entry.id, reason = %reason, "Content undecodable, storing placeholder");
                (PostRecord::placeholder(entry, reason), None)
            }
        }
    }

    async fn run_pass(
        &self,
        source_id: &str,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let contact = self
            .contacts
            .get(source_id)
            .await?
            .ok_or_else(|| SyncError::UnknownContact(source_id.to_string()))?;
        let Some(head) = contact.current_head_locator.clone() else {
            debug!(source_id, "Contact has no head locator, sync skipped");
            return Ok(SyncReport::empty(source_id, None, WalkStop::NoHead));
        };

        let bounds = SyncBounds::resolve(
            options,
            &contact,
            self.config.default_max_items,
            self.config.default_lookback,
            self.clock.now(),
        );
        let walk = walk_chain(self.content.as_ref(), &head, &bounds, self.config.fetch_timeout)
            .await?;

        let own: HashMap<String, bool> = self
            .posts
            .list_by_author(source_id)
            .await?
            .into_iter()
            .map(|post| {
                let placeholder = post.is_placeholder();
                (post.id, placeholder)
            })
            .collect();

        let mut rejected = 0;
        let mut fresh: Vec<&IndexEntry> = Vec::new();
        let mut seen_ids = HashSet::new();
        for entry in &walk.entries {
            if entry.author != source_id {
                warn!(
                    source_id,
                    id = %entry.id,
                    author = %entry.author,
                    "Entry names another author, dropped"
                );
                rejected += 1;
                continue;
            }
            if !seen_ids.insert(entry.id.as_str()) {
                continue;
            }
            match own.get(&entry.id) {
                Some(false) => continue,
                Some(true) => fresh.push(entry),
                None => match self.posts.find(&entry.id).await? {
                    Some(existing) => {
                        warn!(
                            source_id,
                            id = %entry.id,
                            owner = %existing.author,
                            "Entry reuses the id of another author's post, dropped"
                        );
                        rejected += 1;
                    }
                    None => fresh.push(entry),
                },
            }
        }

        let mut report = SyncReport {
            source_id: source_id.to_string(),
            head: Some(head),
            stop: walk.stop.clone(),
            snapshots_visited: walk.snapshots_visited,
            entries_seen: walk.entries.len(),
            new_entries: fresh.len(),
            rejected,
            verified: 0,
            unverified: 0,
            placeholders: 0,
        };

        let mut merged = Vec::with_capacity(fresh.len());
        for batch in fresh.chunks(self.config.fetch_concurrency.max(1)) {
            let results = join_all(batch.iter().map(|entry| self.fetch_entry(entry))).await;
            for (record, verdict) in results {
                match verdict {
                    Some(ContentVerdict::Verified) => report.verified += 1,
                    Some(ContentVerdict::Unverified(_)) => report.unverified += 1,
                    None => report.placeholders += 1,
                }
                merged.push(record);
            }
        }

        if !merged.is_empty() {
            sort_newest_first(&mut merged);
            self.posts.upsert_many(&merged).await?;
        }

        info!(
            source_id,
            snapshots = report.snapshots_visited,
            new = report.new_entries,
            rejected = report.rejected,
            verified = report.verified,
            unverified = report.unverified,
            placeholders = report.placeholders,
            stop = ?report.stop,
            "Contact synced"
        );
        Ok(report)
    }
}

#[async_trait]
impl IndexSyncApi for IndexSyncService {
    async fn sync_contact(
        &self,
        source_id: &str,
        options: SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let Some(mut slot) = SyncSlot::claim(&self.in_flight, source_id) else {
            debug!(source_id, "Sync already running, pass queued");
            return Ok(SyncReport::empty(source_id, None, WalkStop::Coalesced));
        };

        loop {
            let result = self.run_pass(source_id, &options).await;
            if !slot.release_or_rerun() {
                return result;
            }
            debug!(source_id, "Sync requested while running, syncing again");
        }
    }
}
