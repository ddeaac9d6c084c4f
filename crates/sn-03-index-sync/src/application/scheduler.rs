//! # Sync Scheduler
//!
//! Fixed pool of workers pulling contacts off a shared queue. A finished
//! worker immediately takes the next queued contact; at most
//! `contact_workers` contacts sync at once. A contact already waiting in
//! the queue is not queued twice.

use parking_lot::Mutex;
use shared_types::SourceId;
use sn_01_head_updates::{ContactRegistry, SyncTrigger};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{SyncError, SyncOptions};
use crate::ports::IndexSyncApi;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<SourceId>>>;

/// Bounded-concurrency queue of contact syncs.
pub struct SyncScheduler {
    tx: mpsc::UnboundedSender<SourceId>,
    queued: Arc<Mutex<HashSet<SourceId>>>,
    contacts: Arc<dyn ContactRegistry>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    completed: Arc<AtomicU64>,
}

impl SyncScheduler {
    /// Spawn `workers` workers (at least one) running syncs through `api`.
    pub fn start(
        api: Arc<dyn IndexSyncApi>,
        contacts: Arc<dyn ContactRegistry>,
        workers: usize,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let queued = Arc::new(Mutex::new(HashSet::new()));
        let completed = Arc::new(AtomicU64::new(0));

        let handles = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&rx),
                    Arc::clone(&queued),
                    Arc::clone(&api),
                    Arc::clone(&completed),
                ))
            })
            .collect();

        Self {
            tx,
            queued,
            contacts,
            workers: Mutex::new(handles),
            completed,
        }
    }

    /// Queue a sync. Returns `false` if the contact is already queued or
    /// the scheduler is shut down.
    pub fn enqueue(&self, source_id: &str) -> bool {
        if !self.queued.lock().insert(source_id.to_string()) {
            return false;
        }
        if self.tx.send(source_id.to_string()).is_err() {
            self.queued.lock().remove(source_id);
            warn!(source_id, "Sync scheduler stopped, request dropped");
            return false;
        }
        true
    }

    /// Queue every contact that has a head locator. Returns how many were
    /// newly queued.
    pub async fn sync_all_contacts(&self) -> Result<usize, SyncError> {
        let contacts = self.contacts.list().await?;
        let queued = contacts
            .iter()
            .filter(|contact| contact.current_head_locator.is_some())
            .filter(|contact| self.enqueue(&contact.source_id))
            .count();
        info!(contacts = contacts.len(), queued, "Manual refresh of all contacts");
        Ok(queued)
    }

    /// Contacts waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.queued.lock().len()
    }

    /// Syncs finished (successfully or not).
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Stop all workers. Queued syncs are dropped.
    pub fn shutdown(&self) {
        for handle in self.workers.lock().drain(..) {
            handle.abort();
        }
    }
}

impl SyncTrigger for SyncScheduler {
    fn request_sync(&self, source_id: &str) {
        self.enqueue(source_id);
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(
    worker: usize,
    rx: SharedReceiver,
    queued: Arc<Mutex<HashSet<SourceId>>>,
    api: Arc<dyn IndexSyncApi>,
    completed: Arc<AtomicU64>,
) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(source_id) = next else {
            break;
        };
        queued.lock().remove(&source_id);

        match api.sync_contact(&source_id, SyncOptions::default()).await {
            Ok(report) if report.is_coalesced() => {
                debug!(worker, source_id = %source_id, "Sync already running")
            }
            Ok(report) => debug!(worker, source_id = %source_id, merged = report.merged(), "Worker sync done"),
            Err(e) => warn!(worker, source_id = %source_id, error = %e, "Contact sync failed"),
        }
        completed.fetch_add(1, Ordering::Relaxed);
    }
    debug!(worker, "Sync worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SyncReport, WalkStop};
    use async_trait::async_trait;
    use shared_types::Contact;
    use sn_01_head_updates::InMemoryContactRegistry;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSync {
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IndexSyncApi for CountingSync {
        async fn sync_contact(
            &self,
            source_id: &str,
            _options: SyncOptions,
        ) -> Result<SyncReport, SyncError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().push(source_id.to_string());
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(SyncReport::empty(source_id, None, WalkStop::NoHead))
        }
    }

    async fn wait_for(scheduler: &SyncScheduler, completed: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while scheduler.completed() < completed {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    fn registry() -> Arc<InMemoryContactRegistry> {
        let mut with_head = Contact::new("alice");
        with_head.current_head_locator = Some("h-alice".to_string());
        let mut also_head = Contact::new("bob");
        also_head.current_head_locator = Some("h-bob".to_string());
        Arc::new(InMemoryContactRegistry::with_contacts([
            with_head,
            also_head,
            Contact::new("carol"),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_bound_concurrency() {
        let api = Arc::new(CountingSync::default());
        let scheduler = SyncScheduler::start(api.clone(), registry(), 2);

        for id in ["a", "b", "c", "d", "e"] {
            assert!(scheduler.enqueue(id));
        }
        wait_for(&scheduler, 5).await;

        assert_eq!(api.calls.lock().len(), 5);
        assert_eq!(api.max_active.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.queued_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_contact_not_duplicated() {
        let api = Arc::new(CountingSync::default());
        let scheduler = SyncScheduler::start(api.clone(), registry(), 1);

        assert!(scheduler.enqueue("alice"));
        assert!(!scheduler.enqueue("alice"));
        scheduler.request_sync("alice");
        wait_for(&scheduler, 1).await;

        assert_eq!(*api.calls.lock(), vec!["alice".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_all_contacts_skips_headless() {
        let api = Arc::new(CountingSync::default());
        let scheduler = SyncScheduler::start(api.clone(), registry(), 2);

        let queued = scheduler.sync_all_contacts().await.unwrap();
        assert_eq!(queued, 2);
        wait_for(&scheduler, 2).await;

        let mut calls = api.calls.lock().clone();
        calls.sort();
        assert_eq!(calls, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[tokio::test]
    async fn test_shutdown_drops_requests() {
        let api = Arc::new(CountingSync::default());
        let scheduler = SyncScheduler::start(api, registry(), 1);
        scheduler.shutdown();
        tokio::task::yield_now().await;
        // Receiver is gone once the aborted worker is dropped
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!scheduler.enqueue("alice"));
    }
}
