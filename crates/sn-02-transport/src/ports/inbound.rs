//! # Inbound Port: Head-Update Transport
//!
//! Best-effort broadcast of signed head updates. Delivery is at-most-once
//! with no ordering guarantee between senders.

use async_trait::async_trait;
use shared_bus::Subscription;
use shared_types::{HeadUpdateEvent, RawEvent};

use crate::domain::{TransportError, TransportKind};

/// Broadcast channel for head updates.
#[async_trait]
pub trait HeadUpdateTransport: Send + Sync {
    /// Implementation in use.
    fn kind(&self) -> TransportKind;

    /// Start the transport. Calling it again once started is a no-op.
    async fn start(&self) -> Result<(), TransportError>;

    /// Broadcast a signed event.
    async fn publish(&self, event: &HeadUpdateEvent) -> Result<(), TransportError>;

    /// Receive events delivered from now on.
    fn subscribe(&self) -> Subscription<RawEvent>;

    /// Tear down the transport.
    async fn stop(&self) -> Result<(), TransportError>;

    fn is_started(&self) -> bool;
}
