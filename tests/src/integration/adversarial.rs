//! # Adversarial Input
//!
//! Hostile or broken traffic must be dropped without side effects and
//! without disturbing later honest traffic.

#[cfg(test)]
mod tests {
    use super::super::fixtures::Network;
    use chrono::Utc;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{IndexEntry, IndexSnapshot};
    use sn_01_head_updates::test_utils::{signed_head_update, signed_raw};
    use sn_02_transport::HEAD_UPDATE_TOPIC;
    use sn_03_index_sync::{SyncError, SyncOptions, WalkStop};
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_tampered_head_dropped() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);
        bob.start_transport().await;

        let alice = Ed25519KeyPair::generate();
        let mut raw = signed_raw(&alice, "alice", "honest-head", Utc::now());
        raw["newHead"] = serde_json::json!("attacker-head");
        network.hub.inject(HEAD_UPDATE_TOPIC, &raw);
        settle().await;

        assert_eq!(bob.pipeline_stats().invalid_signature, 1);
        assert_eq!(contacts.head_of("alice"), None);
    }

    #[tokio::test]
    async fn test_swapped_key_dropped() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);
        bob.start_transport().await;

        let mallory = Ed25519KeyPair::generate();
        let mut event = signed_head_update(&mallory, "alice", None, "mallory-head", Utc::now());
        event.author_public_key = Ed25519KeyPair::generate().public_key().to_base64();
        network.hub.inject(HEAD_UPDATE_TOPIC, &event);
        settle().await;

        assert_eq!(bob.pipeline_stats().invalid_signature, 1);
        assert_eq!(contacts.head_of("alice"), None);
    }

    #[tokio::test]
    async fn test_junk_then_honest_update() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);
        bob.start_transport().await;

        network.hub.inject_bytes(HEAD_UPDATE_TOPIC, b"\xff\xfe not json");
        network.hub.inject(HEAD_UPDATE_TOPIC, &serde_json::json!({"kind": "chat"}));
        network.hub.inject(
            HEAD_UPDATE_TOPIC,
            &serde_json::json!({"kind": "postIndexHeadUpdate", "signature": "x"}),
        );
        let stale = signed_raw(
            &Ed25519KeyPair::generate(),
            "alice",
            "old-head",
            Utc::now() - chrono::Duration::hours(2),
        );
        network.hub.inject(HEAD_UPDATE_TOPIC, &stale);

        let alice = Ed25519KeyPair::generate();
        network
            .hub
            .inject(HEAD_UPDATE_TOPIC, &signed_raw(&alice, "alice", "good-head", Utc::now()));
        settle().await;

        let stats = bob.pipeline_stats();
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.stale_or_future, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(contacts.head_of("alice"), Some("good-head".to_string()));
    }

    #[tokio::test]
    async fn test_looping_chain_terminates() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);

        // Two snapshots pointing at each other
        let empty = |previous: &str| IndexSnapshot {
            entries: Vec::<IndexEntry>::new(),
            previous_snapshot_locator: Some(previous.to_string()),
        };
        network.content.insert_json("loop-a", &empty("loop-b"));
        network.content.insert_json("loop-b", &empty("loop-a"));
        let mut contact = shared_types::Contact::new("alice");
        contact.current_head_locator = Some("loop-a".to_string());
        contacts.upsert(contact);

        let report = bob.sync_contact("alice", SyncOptions::default()).await.unwrap();
        assert_eq!(report.stop, WalkStop::Cycle);
        assert_eq!(report.snapshots_visited, 2);
    }

    #[tokio::test]
    async fn test_unreachable_head_reported() {
        let network = Network::new();
        let (bob, contacts) = network.node("bob", &["alice"]);
        let mut contact = shared_types::Contact::new("alice");
        contact.current_head_locator = Some("sn:sha256:nowhere".to_string());
        contacts.upsert(contact);

        assert!(matches!(
            bob.sync_contact("alice", SyncOptions::default()).await,
            Err(SyncError::IndexUnavailable { .. })
        ));
    }
}
