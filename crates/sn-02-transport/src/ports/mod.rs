//! # Ports Layer
//!
//! - **Inbound**: [`HeadUpdateTransport`], the broadcast interface the
//!   runtime drives
//! - **Outbound**: [`PubSubNode`] and its factory, the peer-to-peer node
//!   the gossip transport is built on

pub mod inbound;
pub mod outbound;

pub use inbound::HeadUpdateTransport;
pub use outbound::{PubSubNode, PubSubNodeFactory};
