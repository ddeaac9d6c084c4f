//! # Adapters
//!
//! - [`LoopbackTransport`]: in-process delivery
//! - [`GossipTransport`]: head updates over a [`crate::ports::PubSubNode`]
//! - [`Libp2pGossipNode`]: libp2p gossipsub over TCP, Noise and Yamux
//! - [`MemoryPubSubHub`]: in-process pub/sub medium for multi-node tests

pub mod gossip;
pub mod loopback;
pub mod memory;
pub mod p2p;

pub use gossip::GossipTransport;
pub use loopback::LoopbackTransport;
pub use memory::{FailingNodeFactory, MemoryPubSubHub};
pub use p2p::{parse_multiaddr, Libp2pGossipNode, Libp2pNodeFactory};
