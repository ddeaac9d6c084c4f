//! # Transport Subsystem (sn-02)
//!
//! Broadcasts signed head updates to peers and hands inbound ones to the
//! head-update pipeline.
//!
//! ## Transports
//!
//! | Kind | Delivery | Started |
//! |------|----------|---------|
//! | Loopback | In-process, asynchronous | On construction |
//! | Gossip | libp2p gossipsub over TCP (Noise, Yamux) | Lazily, on `start()` |
//!
//! Gossip publishes issued before the node is up are queued (bounded,
//! oldest dropped) and flushed in order on start. If the gossip node cannot
//! be started, [`select_transport`] falls back to loopback.
//!
//! Inbound gossip payloads are dropped unless they decode as JSON and look
//! like a signed head update. Everything else is left to the pipeline.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod selection;

pub use adapters::{
    parse_multiaddr, FailingNodeFactory, GossipTransport, Libp2pGossipNode, Libp2pNodeFactory,
    LoopbackTransport, MemoryPubSubHub,
};
pub use domain::*;
pub use ports::{HeadUpdateTransport, PubSubNode, PubSubNodeFactory};
pub use selection::{select_transport, select_transport_with};
