//! # Head-Update Pipeline Service
//!
//! Runs every inbound head update through a fixed sequence of checks and,
//! if all pass, applies it to contact state.
//!
//! ## Check Order
//!
//! 1. Shape (`malformed`)
//! 2. Replay cache (`duplicate`)
//! 3. Signature over the canonical encoding (`invalid-signature`)
//! 4. Per-source rate window (`rate-limited`)
//! 5. `issuedAt` within the allowed skew (`stale-or-future`)
//! 6. Apply: move the contact head and schedule a sync
//!
//! The signature is recorded in the replay cache before an accepted
//! outcome is returned. No message can stop later messages from being
//! processed.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use async_trait::async_trait;
use shared_bus::{InMemoryEventBus, Subscription};
use shared_crypto::SignatureService;
use shared_types::{canonicalize_value, Canonical, Clock, HeadUpdateEvent, RawEvent};

use crate::domain::{
    check_shape, is_fresh, AcceptedHeadUpdate, HeadApplication, PipelineConfig, PipelineOutcome,
    PipelineStats, RateDecision, RejectReason, ReplayCache, SourceRateLimiter,
};
use crate::ports::inbound::HeadUpdateApi;
use crate::ports::outbound::{ContactRegistry, SyncTrigger};

/// Head-update pipeline.
///
/// ## Thread Safety
///
/// Shareable across tasks via `Arc`. The replay cache, rate windows and
/// stats sit behind short synchronous locks that are never held across
/// an `.await`.
pub struct HeadUpdatePipeline {
    config: PipelineConfig,
    signer: Arc<dyn SignatureService>,
    contacts: Arc<dyn ContactRegistry>,
    sync: Arc<dyn SyncTrigger>,
    clock: Arc<dyn Clock>,
    replay: Mutex<ReplayCache>,
    rate: Mutex<SourceRateLimiter>,
    stats: Mutex<PipelineStats>,
    accepted: InMemoryEventBus<AcceptedHeadUpdate>,
}

impl HeadUpdatePipeline {
    pub fn new(
        config: PipelineConfig,
        signer: Arc<dyn SignatureService>,
        contacts: Arc<dyn ContactRegistry>,
        sync: Arc<dyn SyncTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            replay: Mutex::new(ReplayCache::new(config.replay_capacity)),
            rate: Mutex::new(SourceRateLimiter::new(
                config.rate_window,
                config.rate_max_per_window,
            )),
            stats: Mutex::new(PipelineStats::default()),
            accepted: InMemoryEventBus::new(),
            config,
            signer,
            contacts,
            sync,
            clock,
        }
    }

    /// Number of signatures currently remembered.
    pub fn replay_len(&self) -> usize {
        self.replay.lock().len()
    }

    async fn run_checks(&self, raw: &RawEvent) -> Result<HeadUpdateEvent, RejectReason> {
        let event = check_shape(raw)?;

        if self.replay.lock().contains(&event.signature) {
            return Err(RejectReason::Duplicate);
        }

        // Verify exactly the fields that arrived
        let canonical = canonicalize_value(raw, HeadUpdateEvent::FIELD_ORDER)
            .map_err(|_| RejectReason::Malformed)?;
        let verdict = self
            .signer
            .verify(&canonical, &event.signature, &event.author_public_key)
            .await;
        if let Some(failure) = verdict.failure() {
            warn!(
                source_id = %event.source_id,
                failure = %failure,
                "Head update rejected: signature did not verify"
            );
            return Err(RejectReason::InvalidSignature);
        }

        let now = self.clock.now();
        match self.rate.lock().record(&event.source_id, now) {
            RateDecision::Allowed => {}
            RateDecision::Limited { warn } => {
                if warn {
                    warn!(
                        source_id = %event.source_id,
                        max_per_window = self.config.rate_max_per_window,
                        "Head updates rate-limited for the rest of this window"
                    );
                }
                return Err(RejectReason::RateLimited);
            }
        }

        // Shape check guarantees issuedAt parses
        let issued_at = event.issued_at_time().ok_or(RejectReason::Malformed)?;
        if !is_fresh(issued_at, now, self.config.max_skew) {
            warn!(
                source_id = %event.source_id,
                issued_at = %event.issued_at,
                now = %now,
                "Head update rejected: stale or from the future"
            );
            return Err(RejectReason::StaleOrFuture);
        }

        // Claim the signature; a concurrent copy may have won the race
        if !self.replay.lock().insert(&event.signature) {
            return Err(RejectReason::Duplicate);
        }
        Ok(event)
    }

    async fn apply(&self, event: &HeadUpdateEvent) -> HeadApplication {
        let contact = match self.contacts.get(&event.source_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => return HeadApplication::UnknownSource,
            Err(e) => return HeadApplication::StoreUnavailable(e.to_string()),
        };

        if contact.current_head_locator.as_deref() == Some(event.new_head.as_str()) {
            return HeadApplication::Unchanged;
        }

        if let Err(e) = self
            .contacts
            .set_head_locator(&event.source_id, &event.new_head)
            .await
        {
            return HeadApplication::StoreUnavailable(e.to_string());
        }
        self.sync.request_sync(&event.source_id);
        HeadApplication::Updated
    }
}

#[async_trait]
impl HeadUpdateApi for HeadUpdatePipeline {
    async fn process(&self, raw: RawEvent) -> PipelineOutcome {
        let outcome = match self.run_checks(&raw).await {
            Err(reason) => {
                match reason {
                    RejectReason::Duplicate => trace!("Duplicate head update dropped"),
                    RejectReason::Malformed => debug!("Malformed head update dropped"),
                    // Logged at the point of rejection
                    _ => {}
                }
                PipelineOutcome::Rejected(reason)
            }
            Ok(event) => {
                let application = self.apply(&event).await;
                match &application {
                    HeadApplication::Updated => info!(
                        source_id = %event.source_id,
                        new_head = %event.new_head,
                        "Contact head updated"
                    ),
                    HeadApplication::StoreUnavailable(error) => {
                        warn!(
                            source_id = %event.source_id,
                            error = %error,
                            "Contact registry unavailable, head update not applied"
                        );
                        self.replay.lock().remove(&event.signature);
                    }
                    _ => debug!(
                        source_id = %event.source_id,
                        application = ?application,
                        "Head update accepted"
                    ),
                }
                self.accepted.publish(AcceptedHeadUpdate {
                    event,
                    application: application.clone(),
                });
                PipelineOutcome::Accepted(application)
            }
        };

        self.stats.lock().record(&outcome);
        outcome
    }

    fn subscribe_accepted(&self) -> Subscription<AcceptedHeadUpdate> {
        self.accepted.subscribe()
    }

    fn stats(&self) -> PipelineStats {
        self.stats.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryContactRegistry;
    use crate::test_utils::{signed_head_update, signed_raw, RecordingSyncTrigger};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use shared_crypto::{Ed25519KeyPair, Ed25519Signer, InMemoryKeyStorage, KeyProvisioning};
    use shared_types::{Contact, Locator, ManualClock, StoreError};

    struct Harness {
        pipeline: HeadUpdatePipeline,
        contacts: Arc<InMemoryContactRegistry>,
        sync: Arc<RecordingSyncTrigger>,
        clock: Arc<ManualClock>,
        keypair: Ed25519KeyPair,
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn harness(config: PipelineConfig) -> Harness {
        let contacts = Arc::new(InMemoryContactRegistry::with_contacts([Contact::new(
            "alice",
        )]));
        let sync = Arc::new(RecordingSyncTrigger::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let signer = Arc::new(Ed25519Signer::new(
            Arc::new(InMemoryKeyStorage::new()),
            KeyProvisioning::Lazy,
        ));
        let pipeline = HeadUpdatePipeline::new(
            config,
            signer,
            contacts.clone(),
            sync.clone(),
            clock.clone(),
        );
        Harness {
            pipeline,
            contacts,
            sync,
            clock,
            keypair: Ed25519KeyPair::generate(),
        }
    }

    #[tokio::test]
    async fn test_accepts_and_applies() {
        let h = harness(PipelineConfig::default());
        let mut accepted = h.pipeline.subscribe_accepted();
        let raw = signed_raw(&h.keypair, "alice", "head-1", t0());

        let outcome = h.pipeline.process(raw).await;

        assert_eq!(outcome, PipelineOutcome::Accepted(HeadApplication::Updated));
        assert_eq!(h.contacts.head_of("alice").as_deref(), Some("head-1"));
        assert_eq!(h.sync.requests(), vec!["alice"]);
        assert_eq!(h.pipeline.replay_len(), 1);
        let seen = accepted.try_recv().unwrap().unwrap();
        assert_eq!(seen.event.new_head, "head-1");
    }

    #[tokio::test]
    async fn test_same_head_is_unchanged() {
        let h = harness(PipelineConfig::default());
        h.pipeline
            .process(signed_raw(&h.keypair, "alice", "head-1", t0()))
            .await;
        let again = signed_raw(&h.keypair, "alice", "head-1", t0() + Duration::seconds(1));

        let outcome = h.pipeline.process(again).await;

        assert_eq!(outcome, PipelineOutcome::Accepted(HeadApplication::Unchanged));
        assert_eq!(h.sync.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_applied_once() {
        let h = harness(PipelineConfig::default());
        let raw = signed_raw(&h.keypair, "alice", "head-1", t0());

        let first = h.pipeline.process(raw.clone()).await;
        let second = h.pipeline.process(raw).await;

        assert!(first.is_accepted());
        assert_eq!(second, PipelineOutcome::Rejected(RejectReason::Duplicate));
        assert_eq!(h.sync.requests().len(), 1);
        let stats = h.pipeline.stats();
        assert_eq!((stats.accepted, stats.duplicate), (1, 1));
    }

    #[tokio::test]
    async fn test_tampered_event_rejected() {
        let h = harness(PipelineConfig::default());
        let mut raw = signed_raw(&h.keypair, "alice", "head-1", t0());
        raw["newHead"] = serde_json::json!("head-evil");

        let outcome = h.pipeline.process(raw).await;

        assert_eq!(outcome, PipelineOutcome::Rejected(RejectReason::InvalidSignature));
        assert_eq!(h.contacts.head_of("alice"), None);
        assert_eq!(h.pipeline.replay_len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_rejected() {
        let h = harness(PipelineConfig::default());
        let outcome = h
            .pipeline
            .process(serde_json::json!({"kind": "postIndexHeadUpdate"}))
            .await;
        assert_eq!(outcome, PipelineOutcome::Rejected(RejectReason::Malformed));
    }

    #[tokio::test]
    async fn test_rate_limit_then_recovery() {
        let config = PipelineConfig::for_testing();
        let window = config.rate_window;
        let h = harness(config);

        for i in 0..3 {
            let raw = signed_raw(&h.keypair, "alice", &format!("h{i}"), t0());
            assert!(h.pipeline.process(raw).await.is_accepted());
        }
        let over = signed_raw(&h.keypair, "alice", "h3", t0());
        assert_eq!(
            h.pipeline.process(over).await,
            PipelineOutcome::Rejected(RejectReason::RateLimited)
        );

        h.clock.advance(window);
        let later = signed_raw(&h.keypair, "alice", "h4", t0() + window);
        assert!(h.pipeline.process(later).await.is_accepted());
    }

    #[tokio::test]
    async fn test_stale_and_future_rejected() {
        let h = harness(PipelineConfig::default());
        let skew = PipelineConfig::default().max_skew;

        let stale = signed_raw(
            &h.keypair,
            "alice",
            "h1",
            t0() - skew - Duration::microseconds(1),
        );
        assert_eq!(
            h.pipeline.process(stale).await,
            PipelineOutcome::Rejected(RejectReason::StaleOrFuture)
        );

        let edge = signed_raw(&h.keypair, "alice", "h2", t0() + skew);
        assert!(h.pipeline.process(edge).await.is_accepted());
    }

    #[tokio::test]
    async fn test_unknown_source_accepted_without_sync() {
        let h = harness(PipelineConfig::default());
        let raw = signed_raw(&h.keypair, "mallory", "h1", t0());

        let outcome = h.pipeline.process(raw.clone()).await;

        assert_eq!(outcome, PipelineOutcome::Accepted(HeadApplication::UnknownSource));
        assert!(h.sync.requests().is_empty());
        assert_eq!(
            h.pipeline.process(raw).await,
            PipelineOutcome::Rejected(RejectReason::Duplicate)
        );
    }

    #[tokio::test]
    async fn test_replay_cache_is_bounded() {
        let config = PipelineConfig {
            replay_capacity: 2,
            ..PipelineConfig::default()
        };
        let h = harness(config);
        let first = signed_raw(&h.keypair, "bob", "h0", t0());
        h.pipeline.process(first.clone()).await;
        for i in 1..3 {
            h.pipeline
                .process(signed_raw(&h.keypair, "bob", &format!("h{i}"), t0()))
                .await;
        }
        assert_eq!(h.pipeline.replay_len(), 2);
        // Evicted, so no longer a duplicate
        assert!(h.pipeline.process(first).await.is_accepted());
    }

    struct FailingRegistry;

    #[async_trait]
    impl ContactRegistry for FailingRegistry {
        async fn list(&self) -> Result<Vec<Contact>, StoreError> {
            Err(StoreError::Io("offline".to_string()))
        }
        async fn get(&self, _: &str) -> Result<Option<Contact>, StoreError> {
            Err(StoreError::Io("offline".to_string()))
        }
        async fn set_head_locator(&self, _: &str, _: &Locator) -> Result<(), StoreError> {
            Err(StoreError::Io("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_allows_redelivery() {
        let signer = Arc::new(Ed25519Signer::new(
            Arc::new(InMemoryKeyStorage::new()),
            KeyProvisioning::Lazy,
        ));
        let pipeline = HeadUpdatePipeline::new(
            PipelineConfig::default(),
            signer,
            Arc::new(FailingRegistry),
            Arc::new(RecordingSyncTrigger::new()),
            Arc::new(ManualClock::new(t0())),
        );
        let keypair = Ed25519KeyPair::generate();
        let event = signed_head_update(&keypair, "alice", None, "h1", t0());
        let raw = serde_json::to_value(&event).unwrap();

        let outcome = pipeline.process(raw.clone()).await;
        assert!(matches!(
            outcome,
            PipelineOutcome::Accepted(HeadApplication::StoreUnavailable(_))
        ));
        assert_eq!(pipeline.replay_len(), 0);
        assert!(pipeline.process(raw).await.is_accepted());
    }
}
