//! Cross-subsystem tests. Everything here runs several crates together.

pub mod adversarial;
pub mod flows;
pub mod properties;

#[cfg(test)]
pub(crate) mod fixtures {
    use node_runtime::{NodeComponents, NodeConfig, SnartnetNode};
    use shared_types::Contact;
    use sn_01_head_updates::InMemoryContactRegistry;
    use sn_02_transport::MemoryPubSubHub;
    use sn_03_index_sync::InMemoryContentStore;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    /// Nodes sharing one gossip hub and one content store.
    pub struct Network {
        pub hub: MemoryPubSubHub,
        pub content: InMemoryContentStore,
    }

    impl Network {
        pub fn new() -> Self {
            Self {
                hub: MemoryPubSubHub::new(),
                content: InMemoryContentStore::new(),
            }
        }

        /// A gossiping node following `contacts`.
        pub fn node(
            &self,
            source_id: &str,
            contacts: &[&str],
        ) -> (SnartnetNode, Arc<InMemoryContactRegistry>) {
            let mut config = NodeConfig::for_testing(source_id);
            config.transport.enable_gossip = true;
            self.node_with(config, contacts)
        }

        pub fn node_with(
            &self,
            config: NodeConfig,
            contacts: &[&str],
        ) -> (SnartnetNode, Arc<InMemoryContactRegistry>) {
            let registry = Arc::new(InMemoryContactRegistry::with_contacts(
                contacts.iter().map(|id| Contact::new(*id)),
            ));
            let components =
                NodeComponents::in_memory(Arc::new(self.content.clone()), self.hub.factory())
                    .with_contacts(registry.clone());
            (SnartnetNode::new(config, components), registry)
        }
    }

    /// Poll `check` until it holds or two seconds pass.
    pub async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while !check().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached in time");
    }
}
