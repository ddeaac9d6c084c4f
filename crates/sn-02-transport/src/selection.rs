//! # Transport Selection
//!
//! Picks the transport for a node. Gossip is used only when enabled and it
//! starts; any start failure falls back to loopback with a warning.

use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::{GossipTransport, LoopbackTransport, Libp2pNodeFactory};
use crate::domain::TransportConfig;
use crate::ports::{HeadUpdateTransport, PubSubNodeFactory};

/// Select and start a transport, using libp2p gossip when enabled.
pub async fn select_transport(config: &TransportConfig) -> Arc<dyn HeadUpdateTransport> {
    let factory: Arc<dyn PubSubNodeFactory> = Arc::new(Libp2pNodeFactory::new(config));
    select_transport_with(config, factory).await
}

/// Select and start a transport over the given pub/sub node factory.
///
/// The returned transport is always started.
pub async fn select_transport_with(
    config: &TransportConfig,
    factory: Arc<dyn PubSubNodeFactory>,
) -> Arc<dyn HeadUpdateTransport> {
    if !config.enable_gossip {
        info!("Gossip disabled, using loopback transport");
        return Arc::new(LoopbackTransport::new());
    }

    let gossip = GossipTransport::new(config.clone(), factory);
    match gossip.start().await {
        Ok(()) => Arc::new(gossip),
        Err(e) => {
            warn!(error = %e, "Gossip transport failed to start, falling back to loopback");
            Arc::new(LoopbackTransport::new())
        }
    }
}
