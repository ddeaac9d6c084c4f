//! # Chain Walk
//!
//! Bounded backward walk of an index chain:
//!
//! ```text
//! head → snapshot → snapshot.previous → … → none
//! ```
//!
//! The walk stops at whichever bound is reached first:
//!
//! 1. Chain end (no previous locator)
//! 2. `max_items` in-window entries collected
//! 3. A snapshot holding an entry older than the lookback window. Its
//!    in-window entries are kept, older snapshots are not fetched.
//! 4. A locator seen before (cycle)
//!
//! An unreachable head fails the walk. An unreachable older snapshot ends
//! it with what was collected so far.

use serde::de::DeserializeOwned;
use shared_types::{IndexEntry, IndexSnapshot, Locator};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{ContentStoreError, SyncBounds, SyncError, WalkStop};
use crate::ports::ContentStore;

/// Entries collected by a walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainWalk {
    /// In-window entries, chain order (newest snapshot first), unique by id.
    pub entries: Vec<IndexEntry>,
    /// Snapshots fetched.
    pub snapshots_visited: usize,
    /// Why the walk stopped.
    pub stop: WalkStop,
}

/// Fetch `locator` with a local timeout on top of the store's own.
pub async fn fetch_with_timeout(
    store: &dyn ContentStore,
    locator: &str,
    timeout: Duration,
) -> Result<Vec<u8>, ContentStoreError> {
    match tokio::time::timeout(timeout, store.fetch(locator, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(ContentStoreError::Timeout {
            locator: locator.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Fetch and decode a JSON record.
pub async fn fetch_json<T: DeserializeOwned>(
    store: &dyn ContentStore,
    locator: &str,
    timeout: Duration,
) -> Result<T, ContentStoreError> {
    let bytes = fetch_with_timeout(store, locator, timeout).await?;
    serde_json::from_slice(&bytes).map_err(|e| ContentStoreError::FetchFailed {
        locator: locator.to_string(),
        reason: format!("undecodable: {e}"),
    })
}

/// Walk backward from `head` within `bounds`.
pub async fn walk_chain(
    store: &dyn ContentStore,
    head: &Locator,
    bounds: &SyncBounds,
    fetch_timeout: Duration,
) -> Result<ChainWalk, SyncError> {
    let mut visited: HashSet<Locator> = HashSet::new();
    let mut ids: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    let mut snapshots_visited = 0;
    let mut next = Some(head.clone());

    let stop = loop {
        if entries.len() >= bounds.max_items {
            break WalkStop::MaxItems;
        }
        let Some(locator) = next.take() else {
            break WalkStop::ChainEnd;
        };
        if !visited.insert(locator.clone()) {
            warn!(locator = %locator, "Index chain loops back on itself");
            break WalkStop::Cycle;
        }

        let snapshot: IndexSnapshot = match fetch_json(store, &locator, fetch_timeout).await {
            Ok(snapshot) => snapshot,
            Err(e) if visited.len() == 1 => {
                return Err(SyncError::IndexUnavailable {
                    locator,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "Index snapshot unavailable, walk truncated");
                break WalkStop::Truncated { locator };
            }
        };
        snapshots_visited += 1;

        let mut reached_window_edge = false;
        for entry in snapshot.entries {
            if entries.len() >= bounds.max_items {
                break;
            }
            if !bounds.in_window(entry.created_at) {
                reached_window_edge = true;
                continue;
            }
            if ids.insert(entry.id.clone()) {
                entries.push(entry);
            }
        }

        if reached_window_edge && entries.len() < bounds.max_items {
            break WalkStop::Lookback;
        }
        next = snapshot.previous_snapshot_locator;
    };

    debug!(
        head = %head,
        snapshots = snapshots_visited,
        entries = entries.len(),
        stop = ?stop,
        "Index chain walked"
    );

    Ok(ChainWalk {
        entries,
        snapshots_visited,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryContentStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minute)
    }

    fn entry(id: &str, created_at: DateTime<Utc>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            author: "alice".to_string(),
            created_at,
            content_locator: format!("content-{id}"),
        }
    }

    fn bounds(max_items: usize) -> SyncBounds {
        SyncBounds {
            max_items,
            not_before: t(-1000),
        }
    }

    /// Chain of single-entry snapshots, oldest first in `ids`.
    fn chain(store: &InMemoryContentStore, ids: &[(&str, i64)]) -> Locator {
        let mut previous = None;
        for (id, minute) in ids {
            let snapshot = IndexSnapshot {
                entries: vec![entry(id, t(*minute))],
                previous_snapshot_locator: previous.take(),
            };
            previous = Some(store.insert_json(&format!("snap-{id}"), &snapshot));
        }
        previous.unwrap()
    }

    const TIMEOUT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_walk_to_chain_end() {
        let store = InMemoryContentStore::new();
        let head = chain(&store, &[("a", 0), ("b", 1), ("c", 2)]);

        let walk = walk_chain(&store, &head, &bounds(10), TIMEOUT).await.unwrap();

        let ids: Vec<_> = walk.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(walk.stop, WalkStop::ChainEnd);
        assert_eq!(walk.snapshots_visited, 3);
    }

    #[tokio::test]
    async fn test_walk_stops_at_max_items() {
        let store = InMemoryContentStore::new();
        let head = chain(&store, &[("a", 0), ("b", 1), ("c", 2), ("d", 3)]);

        let walk = walk_chain(&store, &head, &bounds(2), TIMEOUT).await.unwrap();

        assert_eq!(walk.entries.len(), 2);
        assert_eq!(walk.stop, WalkStop::MaxItems);
        assert_eq!(walk.snapshots_visited, 2);
    }

    #[tokio::test]
    async fn test_walk_stops_at_lookback() {
        let store = InMemoryContentStore::new();
        let head = chain(&store, &[("old", -2000), ("older-edge", -1500), ("new", 0)]);

        let walk = walk_chain(&store, &head, &bounds(10), TIMEOUT).await.unwrap();

        let ids: Vec<_> = walk.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
        assert_eq!(walk.stop, WalkStop::Lookback);
        // "old" snapshot is never fetched
        assert_eq!(walk.snapshots_visited, 2);
    }

    #[tokio::test]
    async fn test_walk_detects_cycle() {
        let store = InMemoryContentStore::new();
        let a = IndexSnapshot {
            entries: vec![entry("a", t(0))],
            previous_snapshot_locator: Some("snap-b".to_string()),
        };
        let b = IndexSnapshot {
            entries: vec![entry("b", t(1))],
            previous_snapshot_locator: Some("snap-a".to_string()),
        };
        store.insert_json("snap-a", &a);
        store.insert_json("snap-b", &b);

        let walk = walk_chain(&store, &"snap-a".to_string(), &bounds(10), TIMEOUT)
            .await
            .unwrap();

        assert_eq!(walk.stop, WalkStop::Cycle);
        assert_eq!(walk.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_head_fails() {
        let store = InMemoryContentStore::new();
        let result = walk_chain(&store, &"missing".to_string(), &bounds(10), TIMEOUT).await;
        assert!(matches!(result, Err(SyncError::IndexUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_older_snapshot_truncates() {
        let store = InMemoryContentStore::new();
        let head = chain(&store, &[("a", 0), ("b", 1)]);
        store.fail("snap-a");

        let walk = walk_chain(&store, &head, &bounds(10), TIMEOUT).await.unwrap();

        assert_eq!(walk.entries.len(), 1);
        assert!(matches!(walk.stop, WalkStop::Truncated { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_ids_counted_once() {
        let store = InMemoryContentStore::new();
        let first = store.insert_json(
            "snap-1",
            &IndexSnapshot {
                entries: vec![entry("a", t(0))],
                previous_snapshot_locator: None,
            },
        );
        let head = store.insert_json(
            "snap-2",
            &IndexSnapshot {
                entries: vec![entry("b", t(1)), entry("a", t(0))],
                previous_snapshot_locator: Some(first),
            },
        );

        let walk = walk_chain(&store, &head, &bounds(10), TIMEOUT).await.unwrap();
        assert_eq!(walk.entries.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_head_times_out() {
        let store = InMemoryContentStore::new();
        let head = chain(&store, &[("a", 0)]);
        store.delay(&head, Duration::from_secs(5));

        let result = walk_chain(&store, &head, &bounds(10), TIMEOUT).await;
        match result {
            Err(SyncError::IndexUnavailable { reason, .. }) => assert!(reason.contains("timed out")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
