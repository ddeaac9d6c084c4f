//! # Shared Bus - In-Process Event Fan-Out
//!
//! One-to-many delivery of events inside a node. The loopback transport
//! delivers head updates through it, and the runtime exposes accepted
//! head updates to the application layer through it.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Producer    │    publish()       │  Consumer    │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery Semantics
//!
//! - Every subscriber sees each event published after it subscribed.
//! - At-most-once: a lagging subscriber loses the oldest events.
//! - No ordering guarantee across producers.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

pub use publisher::InMemoryEventBus;
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest is dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
