//! # System Properties
//!
//! Guarantees that must hold whatever the traffic looks like:
//!
//! - **Replay idempotence**: one accepted outcome and one head move per
//!   signed update, however often it is delivered
//! - **Rate limiting**: the 31st update in a window is dropped, the next
//!   window accepts again
//! - **Sync termination**: a long chain is never walked past `maxItems`
//! - **Partial failure**: one slow item becomes a placeholder, the rest
//!   merge normally

#[cfg(test)]
mod tests {
    use super::super::fixtures::Network;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use shared_crypto::{Ed25519KeyPair, Ed25519Signer, InMemoryKeyStorage, KeyProvisioning};
    use shared_types::{Clock, Contact, IndexSnapshot, ManualClock};
    use sn_01_head_updates::test_utils::{signed_raw, RecordingSyncTrigger};
    use sn_01_head_updates::{
        HeadUpdateApi, HeadUpdatePipeline, InMemoryContactRegistry, PipelineConfig, RejectReason,
    };
    use sn_02_transport::HEAD_UPDATE_TOPIC;
    use sn_03_index_sync::adapters::LOCATOR_PREFIX;
    use sn_03_index_sync::test_utils::{seed_chain, signed_post_entry};
    use sn_03_index_sync::{
        IndexSyncApi, IndexSyncService, InMemoryContentStore, InMemoryPostStore, SyncConfig,
        SyncOptions, WalkStop,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn verifier() -> Arc<Ed25519Signer> {
        Arc::new(Ed25519Signer::new(
            Arc::new(InMemoryKeyStorage::new()),
            KeyProvisioning::Lazy,
        ))
    }

    // =========================================================================
    // REPLAY IDEMPOTENCE
    // =========================================================================

    #[tokio::test]
    async fn test_replayed_gossip_applied_once() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);
        bob.start_transport().await;
        let mut accepted = bob.on_head_update();

        let alice = Ed25519KeyPair::generate();
        let raw = signed_raw(&alice, "alice", "head-1", Utc::now());
        for _ in 0..3 {
            assert_eq!(network.hub.inject(HEAD_UPDATE_TOPIC, &raw), 1);
        }

        let first = accepted.recv().await.unwrap();
        assert_eq!(first.event.new_head, "head-1");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stats = bob.pipeline_stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.heads_updated, 1);
        assert_eq!(stats.duplicate, 2);
        assert_eq!(contacts.head_of("alice"), Some("head-1".to_string()));
        assert!(accepted.try_recv().unwrap().is_none());
    }

    // =========================================================================
    // RATE LIMITING
    // =========================================================================

    #[tokio::test]
    async fn test_thirty_first_update_rate_limited_then_recovers() {
        let clock = Arc::new(ManualClock::new(start()));
        let trigger = Arc::new(RecordingSyncTrigger::new());
        let pipeline = HeadUpdatePipeline::new(
            PipelineConfig::default(),
            verifier(),
            Arc::new(InMemoryContactRegistry::with_contacts([Contact::new("alice")])),
            trigger.clone(),
            clock.clone(),
        );
        let alice = Ed25519KeyPair::generate();

        for i in 0..30 {
            let raw = signed_raw(&alice, "alice", &format!("head-{i}"), clock.now());
            assert!(pipeline.process(raw).await.is_accepted(), "update {i}");
        }
        for i in 30..33 {
            let raw = signed_raw(&alice, "alice", &format!("head-{i}"), clock.now());
            assert_eq!(
                pipeline.process(raw).await.reject_reason(),
                Some(RejectReason::RateLimited)
            );
        }

        clock.advance(ChronoDuration::seconds(60));
        let raw = signed_raw(&alice, "alice", "head-next", clock.now());
        assert!(pipeline.process(raw).await.is_accepted());

        let stats = pipeline.stats();
        assert_eq!(stats.accepted, 31);
        assert_eq!(stats.rate_limited, 3);
        assert_eq!(trigger.requests().len(), 31);
    }

    // =========================================================================
    // SYNC TERMINATION
    // =========================================================================

    #[tokio::test]
    async fn test_long_chain_bounded_by_max_items() {
        let content = InMemoryContentStore::new();
        let alice = Ed25519KeyPair::generate();
        let head = seed_chain(
            &content,
            &alice,
            "alice",
            1000,
            start(),
            ChronoDuration::minutes(1),
        );

        let mut contact = Contact::new("alice");
        contact.current_head_locator = Some(head);
        let posts = Arc::new(InMemoryPostStore::new());
        let service = IndexSyncService::new(
            SyncConfig::for_testing(),
            Arc::new(content.clone()),
            posts.clone(),
            Arc::new(InMemoryContactRegistry::with_contacts([contact])),
            verifier(),
            Arc::new(ManualClock::new(start())),
        );

        let report = service
            .sync_contact(
                "alice",
                SyncOptions {
                    max_items: Some(50),
                    lookback: None,
                },
            )
            .await
            .unwrap();

        let fetched = content.fetched();
        let content_fetches = fetched
            .iter()
            .filter(|locator| locator.starts_with(LOCATOR_PREFIX))
            .count();
        assert!(content_fetches <= 50, "fetched {content_fetches} items");
        assert!(fetched.len() <= 101, "walked {} locators", fetched.len());
        assert_eq!(report.stop, WalkStop::MaxItems);
        assert_eq!(report.new_entries, 50);
        assert_eq!(posts.len(), 50);
        assert!(posts.get("alice-0").is_some());
        assert!(posts.get("alice-50").is_none());
    }

    // =========================================================================
    // PARTIAL FAILURE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_one_slow_item_of_five_becomes_placeholder() {
        let content = InMemoryContentStore::new();
        let alice = Ed25519KeyPair::generate();
        let entries: Vec<_> = (0..5)
            .map(|i| {
                signed_post_entry(
                    &content,
                    &alice,
                    "alice",
                    &format!("p{i}"),
                    &format!("body {i}"),
                    start() - ChronoDuration::minutes(i),
                )
            })
            .collect();
        content.delay(&entries[2].content_locator, Duration::from_secs(60));
        let head = content.insert_json(
            "snapshot:alice:only",
            &IndexSnapshot {
                entries: entries.clone(),
                previous_snapshot_locator: None,
            },
        );

        let mut contact = Contact::new("alice");
        contact.current_head_locator = Some(head);
        let posts = Arc::new(InMemoryPostStore::new());
        let service = IndexSyncService::new(
            SyncConfig::for_testing(),
            Arc::new(content.clone()),
            posts.clone(),
            Arc::new(InMemoryContactRegistry::with_contacts([contact])),
            verifier(),
            Arc::new(ManualClock::new(start())),
        );

        let report = service
            .sync_contact("alice", SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(report.verified, 4);
        assert_eq!(report.placeholders, 1);
        assert!(posts.get("p2").unwrap().is_placeholder());
        for id in ["p0", "p1", "p3", "p4"] {
            let post = posts.get(id).unwrap();
            assert!(!post.is_placeholder());
            assert_eq!(post.signature_verified, Some(true));
        }
    }
}
