//! Outbound ports (SPI) for the gossip transport.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::{GossipMessage, TransportError};

/// A running peer-to-peer pub/sub node.
///
/// Messages for subscribed topics are pushed into the channel handed to
/// [`PubSubNodeFactory::create`].
#[async_trait]
pub trait PubSubNode: Send + Sync {
    /// Start receiving messages for `topic`.
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;

    /// Send a payload to every reachable peer on `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Connect to a peer.
    async fn dial(&self, peer: &str) -> Result<(), TransportError>;

    /// Shut the node down.
    async fn stop(&self) -> Result<(), TransportError>;
}

/// Builds pub/sub nodes; called lazily on first transport start.
#[async_trait]
pub trait PubSubNodeFactory: Send + Sync {
    /// Construct and start a node delivering inbound messages to `inbound`.
    async fn create(
        &self,
        inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Arc<dyn PubSubNode>, TransportError>;
}
