//! # Gossip Transport
//!
//! Head-update transport over a peer-to-peer pub/sub node.
//!
//! - The node is built lazily on the first `start()` and subscribed to the
//!   head-update topic.
//! - Inbound payloads must decode as JSON and pass the head-update shape
//!   check before subscribers see them.
//! - Publishes issued before the node is ready are queued and flushed in
//!   FIFO order once it is.
//! - Bootstrap peers are dialed after start; a failed dial is only logged.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::{InMemoryEventBus, Subscription};
use shared_types::{HeadUpdateEvent, RawEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{
    is_head_update_shape, GossipMessage, TransportConfig, TransportError, TransportKind,
    MAX_PENDING_PUBLISHES,
};
use crate::ports::{HeadUpdateTransport, PubSubNode, PubSubNodeFactory};

/// Inbound messages buffered between the node and the pump task.
const INBOUND_BUFFER: usize = 1024;

#[derive(Default)]
struct GossipState {
    node: Option<Arc<dyn PubSubNode>>,
    pending: VecDeque<HeadUpdateEvent>,
    started: bool,
    pump: Option<JoinHandle<()>>,
}

/// Transport backed by a [`PubSubNode`].
pub struct GossipTransport {
    config: TransportConfig,
    factory: Arc<dyn PubSubNodeFactory>,
    bus: InMemoryEventBus<RawEvent>,
    state: Mutex<GossipState>,
    start_lock: tokio::sync::Mutex<()>,
}

impl GossipTransport {
    pub fn new(config: TransportConfig, factory: Arc<dyn PubSubNodeFactory>) -> Self {
        Self {
            config,
            factory,
            bus: InMemoryEventBus::new(),
            state: Mutex::new(GossipState::default()),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Publishes waiting for the node to become ready.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    async fn init_node(
        &self,
        inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Arc<dyn PubSubNode>, TransportError> {
        let node = self.factory.create(inbound).await?;
        if let Err(e) = node.subscribe(&self.config.topic).await {
            let _ = node.stop().await;
            return Err(e);
        }
        Ok(node)
    }

    async fn send(&self, node: &dyn PubSubNode, event: &HeadUpdateEvent) -> Result<(), TransportError> {
        let payload =
            serde_json::to_vec(event).map_err(|e| TransportError::Serialization(e.to_string()))?;
        let timeout_ms = self.config.publish_timeout.as_millis() as u64;
        let result = match tokio::time::timeout(
            self.config.publish_timeout,
            node.publish(&self.config.topic, payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::PublishTimeout(timeout_ms)),
        };
        if let Err(e) = &result {
            warn!(source_id = %event.source_id, error = %e, "Gossip publish failed");
        }
        result
    }

    async fn flush_pending(&self, node: &dyn PubSubNode) {
        loop {
            let batch: Vec<HeadUpdateEvent> = {
                let mut state = self.state.lock();
                if state.pending.is_empty() {
                    state.started = true;
                    return;
                }
                state.pending.drain(..).collect()
            };
            debug!(count = batch.len(), "Flushing queued head updates");
            for event in &batch {
                // Failures are logged in send
                let _ = self.send(node, event).await;
            }
        }
    }
}

async fn pump_inbound(
    mut inbound: mpsc::Receiver<GossipMessage>,
    topic: String,
    bus: InMemoryEventBus<RawEvent>,
) {
    while let Some(message) = inbound.recv().await {
        if message.topic != topic {
            continue;
        }
        match serde_json::from_slice::<RawEvent>(&message.data) {
            Ok(raw) if is_head_update_shape(&raw) => {
                bus.publish(raw);
            }
            Ok(_) => debug!("Gossip payload is not a signed head update, dropped"),
            Err(e) => warn!(error = %e, "Failed to decode gossip payload"),
        }
    }
    debug!("Gossip inbound channel closed");
}

#[async_trait]
impl HeadUpdateTransport for GossipTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Gossip
    }

    async fn start(&self) -> Result<(), TransportError> {
        let _guard = self.start_lock.lock().await;
        if self.is_started() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let timeout_ms = self.config.start_timeout.as_millis() as u64;
        let node = match tokio::time::timeout(self.config.start_timeout, self.init_node(tx)).await {
            Ok(Ok(node)) => node,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(TransportError::StartTimeout(timeout_ms)),
        };

        let pump = tokio::spawn(pump_inbound(rx, self.config.topic.clone(), self.bus.clone()));
        {
            let mut state = self.state.lock();
            state.node = Some(Arc::clone(&node));
            state.pump = Some(pump);
        }

        self.flush_pending(node.as_ref()).await;

        for peer in &self.config.bootstrap_peers {
            if let Err(e) = node.dial(peer).await {
                warn!(peer = %peer, error = %e, "Bootstrap dial failed");
            }
        }

        info!(topic = %self.config.topic, "Gossip transport started");
        Ok(())
    }

    async fn publish(&self, event: &HeadUpdateEvent) -> Result<(), TransportError> {
        let node = {
            let mut state = self.state.lock();
            if !state.started {
                if state.pending.len() >= MAX_PENDING_PUBLISHES {
                    state.pending.pop_front();
                    warn!("Pending publish queue full, oldest head update dropped");
                }
                state.pending.push_back(event.clone());
                debug!(queued = state.pending.len(), "Gossip not ready, head update queued");
                return Ok(());
            }
            state.node.clone()
        };

        match node {
            Some(node) => self.send(node.as_ref(), event).await,
            None => Err(TransportError::Stopped),
        }
    }

    fn subscribe(&self) -> Subscription<RawEvent> {
        self.bus.subscribe()
    }

    async fn stop(&self) -> Result<(), TransportError> {
        let _guard = self.start_lock.lock().await;
        let (node, pump) = {
            let mut state = self.state.lock();
            state.started = false;
            (state.node.take(), state.pump.take())
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(node) = node {
            node.stop().await?;
            info!("Gossip transport stopped");
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state.lock().started
    }
}
