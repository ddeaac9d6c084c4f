//! # Integration Test Flows
//!
//! A post travels from its author to a follower:
//!
//! 1. **Publisher (3)**: post signed, content and snapshot published
//! 2. **Transport (2)**: signed head update gossiped
//! 3. **Pipeline (1)**: follower verifies it and moves the contact head
//! 4. **Index sync (3)**: follower walks the chain and stores the post

#[cfg(test)]
mod tests {
    use super::super::fixtures::{eventually, Network};
    use node_runtime::{NodeComponents, NodeConfig, SnartnetNode};
    use shared_crypto::verify_signature;
    use shared_types::{Canonical, Contact, PublishState};
    use sn_01_head_updates::{HeadApplication, InMemoryContactRegistry};
    use sn_02_transport::TransportKind;
    use sn_03_index_sync::{SyncOptions, WalkStop};
    use std::sync::Arc;

    // =========================================================================
    // SINGLE POST, EXPLICIT SYNC
    // =========================================================================

    #[tokio::test]
    async fn test_hello_from_alice() {
        let network = Network::new();
        let alice = SnartnetNode::new(
            NodeConfig::for_testing("alice"),
            NodeComponents::in_memory(
                Arc::new(network.content.clone()),
                network.hub.factory(),
            ),
        );

        let post = alice.publish_post("hello").await.unwrap();
        assert_eq!(post.publish_state, Some(PublishState::Committed));

        let event = alice.last_published().unwrap();
        assert_eq!(event.source_id, "alice");
        assert_eq!(event.previous_head, None);
        assert_eq!(Some(event.new_head.clone()), alice.current_head());
        let canonical = event.canonical_bytes().unwrap();
        assert!(verify_signature(&canonical, &event.signature, &event.author_public_key).is_valid());

        // Bob learned the head out of band
        let registry = Arc::new(InMemoryContactRegistry::with_contacts([Contact::new("alice")]));
        let bob = SnartnetNode::new(
            NodeConfig::for_testing("bob"),
            NodeComponents::in_memory(Arc::new(network.content.clone()), network.hub.factory())
                .with_contacts(registry.clone()),
        );
        let mut contact = Contact::new("alice");
        contact.current_head_locator = Some(event.new_head.clone());
        registry.upsert(contact);

        let report = bob.sync_contact("alice", SyncOptions::default()).await.unwrap();
        assert_eq!(report.stop, WalkStop::ChainEnd);
        assert_eq!(report.new_entries, 1);
        assert_eq!(report.verified, 1);

        let posts = bob.posts_by_author("alice").await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].content, "hello");
        assert_eq!(posts[0].signature_verified, Some(true));
        assert_eq!(posts[0].fingerprint, Some(alice.fingerprint().await.unwrap()));
    }

    // =========================================================================
    // GOSSIP DRIVES THE SYNC
    // =========================================================================

    #[tokio::test]
    async fn test_gossiped_head_triggers_sync() {
        let network = Network::new();
        let (alice, _) = network.node("alice", &[]);
        let (bob, bob_contacts) = network.node("bob", &["alice"]);

        assert_eq!(alice.start_transport().await, TransportKind::Gossip);
        assert_eq!(bob.start_transport().await, TransportKind::Gossip);
        let mut accepted = bob.on_head_update();

        alice.publish_post("first").await.unwrap();

        let update = accepted.recv().await.unwrap();
        assert_eq!(update.event.source_id, "alice");
        assert_eq!(update.application, HeadApplication::Updated);
        assert_eq!(bob_contacts.head_of("alice"), alice.current_head());

        let follower = &bob;
        eventually(move || async move {
            follower.posts_by_author("alice").await.unwrap().len() == 1
        })
        .await;

        alice.publish_post("second").await.unwrap();
        eventually(move || async move {
            follower.posts_by_author("alice").await.unwrap().len() == 2
        })
        .await;

        let bodies: Vec<_> = bob
            .posts_by_author("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.content)
            .collect();
        assert!(bodies.contains(&"first".to_string()));
        assert!(bodies.contains(&"second".to_string()));
        assert_eq!(bob_contacts.head_of("alice"), alice.current_head());
    }

    #[tokio::test]
    async fn test_second_head_links_to_first() {
        let network = Network::new();
        let (alice, _) = network.node("alice", &[]);
        alice.start_transport().await;

        alice.publish_post("one").await.unwrap();
        let first = alice.last_published().unwrap();
        alice.publish_post("two").await.unwrap();
        let second = alice.last_published().unwrap();

        assert_eq!(second.previous_head, Some(first.new_head));
        assert_eq!(second.item_count, Some(2));
        assert_eq!(alice.published_count(), 2);
    }

    // =========================================================================
    // MANUAL REFRESH
    // =========================================================================

    #[tokio::test]
    async fn test_sync_all_contacts_pulls_every_known_head() {
        let network = Network::new();
        let (alice, _) = network.node("alice", &[]);
        let (carol, _) = network.node("carol", &[]);
        alice.publish_post("from alice").await.unwrap();
        carol.publish_post("from carol").await.unwrap();

        // Dave was offline for both broadcasts
        let (dave, dave_contacts) = network.node("dave", &["alice", "carol", "erin"]);
        for author in [&alice, &carol] {
            let mut contact = Contact::new(author.source_id());
            contact.current_head_locator = author.current_head();
            dave_contacts.upsert(contact);
        }

        assert_eq!(dave.sync_all_contacts().await.unwrap(), 2);
        let follower = &dave;
        eventually(move || async move { follower.syncs_completed() >= 2 }).await;

        assert_eq!(dave.posts_by_author("alice").await.unwrap().len(), 1);
        assert_eq!(dave.posts_by_author("carol").await.unwrap().len(), 1);
        assert!(dave.posts_by_author("erin").await.unwrap().is_empty());
    }
}
