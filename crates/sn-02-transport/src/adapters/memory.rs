//! # In-Memory Pub/Sub Hub
//!
//! Connects any number of in-process [`PubSubNode`]s. Used to run several
//! nodes in one process, for instance in integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{GossipMessage, TransportError};
use crate::ports::{PubSubNode, PubSubNodeFactory};

struct Member {
    topics: HashSet<String>,
    inbound: mpsc::Sender<GossipMessage>,
}

#[derive(Default)]
struct HubInner {
    members: Mutex<HashMap<u64, Member>>,
    next_id: AtomicU64,
}

impl HubInner {
    fn deliver(&self, from: Option<u64>, topic: &str, payload: &[u8]) -> usize {
        let members = self.members.lock();
        let mut delivered = 0;
        for (id, member) in members.iter() {
            if Some(*id) == from || !member.topics.contains(topic) {
                continue;
            }
            let message = GossipMessage {
                topic: topic.to_string(),
                data: payload.to_vec(),
            };
            if member.inbound.try_send(message).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Shared in-memory medium.
#[derive(Clone, Default)]
pub struct MemoryPubSubHub {
    inner: Arc<HubInner>,
}

impl MemoryPubSubHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory creating nodes attached to this hub.
    pub fn factory(&self) -> Arc<dyn PubSubNodeFactory> {
        Arc::new(MemoryNodeFactory { hub: self.clone() })
    }

    /// Deliver a payload to every node subscribed to `topic`, as if sent
    /// by an outside peer.
    pub fn inject<T: Serialize>(&self, topic: &str, payload: &T) -> usize {
        match serde_json::to_vec(payload) {
            Ok(bytes) => self.inner.deliver(None, topic, &bytes),
            Err(_) => 0,
        }
    }

    /// Deliver raw bytes to every node subscribed to `topic`.
    pub fn inject_bytes(&self, topic: &str, payload: &[u8]) -> usize {
        self.inner.deliver(None, topic, payload)
    }

    /// Nodes currently attached.
    pub fn member_count(&self) -> usize {
        self.inner.members.lock().len()
    }
}

struct MemoryNodeFactory {
    hub: MemoryPubSubHub,
}

#[async_trait]
impl PubSubNodeFactory for MemoryNodeFactory {
    async fn create(
        &self,
        inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Arc<dyn PubSubNode>, TransportError> {
        let id = self.hub.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.hub.inner.members.lock().insert(
            id,
            Member {
                topics: HashSet::new(),
                inbound,
            },
        );
        debug!(node = id, "Memory pub/sub node attached");
        Ok(Arc::new(MemoryNode {
            id,
            hub: Arc::clone(&self.hub.inner),
        }))
    }
}

struct MemoryNode {
    id: u64,
    hub: Arc<HubInner>,
}

#[async_trait]
impl PubSubNode for MemoryNode {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let mut members = self.hub.members.lock();
        let member = members.get_mut(&self.id).ok_or(TransportError::Stopped)?;
        member.topics.insert(topic.to_string());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.hub.members.lock().contains_key(&self.id) {
            return Err(TransportError::Stopped);
        }
        self.hub.deliver(Some(self.id), topic, &payload);
        Ok(())
    }

    async fn dial(&self, peer: &str) -> Result<(), TransportError> {
        // Every member is already connected through the hub
        Err(TransportError::InvalidPeer(peer.to_string()))
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.hub.members.lock().remove(&self.id);
        Ok(())
    }
}

/// Factory whose nodes never come up.
pub struct FailingNodeFactory;

#[async_trait]
impl PubSubNodeFactory for FailingNodeFactory {
    async fn create(
        &self,
        _inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Arc<dyn PubSubNode>, TransportError> {
        Err(TransportError::Init("pub/sub node unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hub_skips_sender_and_unsubscribed() {
        let hub = MemoryPubSubHub::new();
        let factory = hub.factory();
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let (tx_c, mut rx_c) = mpsc::channel(8);
        let a = factory.create(tx_a).await.unwrap();
        let b = factory.create(tx_b).await.unwrap();
        let _c = factory.create(tx_c).await.unwrap();
        a.subscribe("t").await.unwrap();
        b.subscribe("t").await.unwrap();

        a.publish("t", b"x".to_vec()).await.unwrap();

        assert_eq!(rx_b.try_recv().unwrap().data, b"x".to_vec());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_node_cannot_publish() {
        let hub = MemoryPubSubHub::new();
        let (tx, _rx) = mpsc::channel(8);
        let node = hub.factory().create(tx).await.unwrap();
        node.stop().await.unwrap();
        assert_eq!(
            node.publish("t", Vec::new()).await,
            Err(TransportError::Stopped)
        );
    }
}
