//! # Event Publisher
//!
//! Defines the publishing side of the event bus.

use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// In-memory event bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
/// semantics. Cloning the bus yields another handle to the same channel.
pub struct InMemoryEventBus<T> {
    /// Broadcast sender for events.
    sender: broadcast::Sender<T>,

    /// Total events published.
    events_published: std::sync::Arc<AtomicU64>,

    /// Channel capacity.
    capacity: usize,
}

impl<T> Clone for InMemoryEventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            events_published: self.events_published.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone + Send + 'static> InMemoryEventBus<T> {
    /// Create a new in-memory event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: std::sync::Arc::new(AtomicU64::new(0)),
            capacity,
        }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of subscribers that will see the event. With no
    /// subscribers the event is dropped.
    pub fn publish(&self, event: T) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(receivers, "Event published");
                receivers
            }
            Err(_) => {
                debug!("Event dropped (no receivers)");
                0
            }
        }
    }

    /// Subscribe to all events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription::new(self.sender.subscribe())
    }

    /// Subscription as a `Stream`.
    #[must_use]
    pub fn event_stream(&self) -> EventStream<T> {
        EventStream::new(self.sender.subscribe())
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the total number of events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl<T: Clone + Send + 'static> Default for InMemoryEventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();

        let receivers = bus.publish(7);
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_publish_with_subscriber() {
        let bus = InMemoryEventBus::new();

        // Create subscriber BEFORE publishing
        let _sub = bus.subscribe();

        let receivers = bus.publish("event".to_string());

        assert_eq!(receivers, 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = InMemoryEventBus::new();

        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        let _sub3 = bus.subscribe();

        assert_eq!(bus.publish(1u8), 3);
    }

    #[tokio::test]
    async fn test_clone_shares_channel() {
        let bus = InMemoryEventBus::new();
        let other = bus.clone();
        let mut sub = bus.subscribe();

        other.publish(42u64);
        assert_eq!(sub.try_recv().unwrap(), Some(42));
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_default_bus() {
        let bus: InMemoryEventBus<()> = InMemoryEventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.events_published(), 0);
    }
}
