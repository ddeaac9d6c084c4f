//! # Loopback Transport
//!
//! In-process delivery for single-node operation and tests. A publish is
//! handed to a spawned task, so subscribers always see it asynchronously.

use async_trait::async_trait;
use shared_bus::{InMemoryEventBus, Subscription};
use shared_types::{HeadUpdateEvent, RawEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use crate::domain::{TransportError, TransportKind};
use crate::ports::HeadUpdateTransport;

/// In-process transport. Started on construction.
pub struct LoopbackTransport {
    bus: InMemoryEventBus<RawEvent>,
    started: AtomicBool,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            bus: InMemoryEventBus::new(),
            started: AtomicBool::new(true),
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HeadUpdateTransport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Loopback
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, event: &HeadUpdateEvent) -> Result<(), TransportError> {
        if !self.is_started() {
            return Err(TransportError::Stopped);
        }
        let raw = serde_json::to_value(event)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let receivers = bus.publish(raw);
            trace!(receivers, "Loopback delivery");
        });
        Ok(())
    }

    fn subscribe(&self) -> Subscription<RawEvent> {
        self.bus.subscribe()
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}
