//! # Transport Wiring
//!
//! Owns the node's single transport. The transport is selected and started
//! on first use; starting it also spawns the inbound pump that feeds every
//! received head update into the pipeline.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::Subscription;
use shared_types::{HeadUpdateEvent, RawEvent};
use sn_01_head_updates::HeadUpdateApi;
use sn_02_transport::{select_transport_with, HeadUpdateTransport, PubSubNodeFactory, TransportConfig};
use sn_03_index_sync::{HeadBroadcaster, PublishError};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Lazily started transport plus its inbound pump.
pub struct TransportHandle {
    config: TransportConfig,
    factory: Arc<dyn PubSubNodeFactory>,
    pipeline: Arc<dyn HeadUpdateApi>,
    transport: OnceCell<Arc<dyn HeadUpdateTransport>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl TransportHandle {
    pub fn new(
        config: TransportConfig,
        factory: Arc<dyn PubSubNodeFactory>,
        pipeline: Arc<dyn HeadUpdateApi>,
    ) -> Self {
        Self {
            config,
            factory,
            pipeline,
            transport: OnceCell::new(),
            pump: Mutex::new(None),
        }
    }

    /// Select and start the transport once; later calls return the same one.
    pub async fn get_or_start(&self) -> Arc<dyn HeadUpdateTransport> {
        let transport = self
            .transport
            .get_or_init(|| async {
                let transport = select_transport_with(&self.config, Arc::clone(&self.factory)).await;
                let pump = tokio::spawn(pump_inbound(
                    transport.subscribe(),
                    Arc::clone(&self.pipeline),
                ));
                *self.pump.lock() = Some(pump);
                info!(kind = transport.kind().as_str(), "Transport started");
                transport
            })
            .await;
        Arc::clone(transport)
    }

    /// The transport, if it has been started.
    pub fn current(&self) -> Option<Arc<dyn HeadUpdateTransport>> {
        self.transport.get().cloned()
    }

    /// Stop the inbound pump and the transport.
    pub async fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        if let Some(transport) = self.current() {
            if let Err(e) = transport.stop().await {
                debug!(error = %e, "Transport stop failed");
            }
        }
    }
}

async fn pump_inbound(mut inbound: Subscription<RawEvent>, pipeline: Arc<dyn HeadUpdateApi>) {
    while let Some(raw) = inbound.recv().await {
        let outcome = pipeline.process(raw).await;
        trace!(?outcome, "Inbound head update processed");
    }
    debug!("Inbound pump exiting");
}

/// Head broadcaster publishing through the node transport.
pub struct TransportBroadcaster {
    handle: Arc<TransportHandle>,
}

impl TransportBroadcaster {
    pub fn new(handle: Arc<TransportHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl HeadBroadcaster for TransportBroadcaster {
    async fn broadcast(&self, event: &HeadUpdateEvent) -> Result<(), PublishError> {
        self.handle
            .get_or_start()
            .await
            .publish(event)
            .await
            .map_err(|e| PublishError::Broadcast(e.to_string()))
    }
}
