//! # Transport Domain
//!
//! Configuration, errors, and inbound gossip messages.

mod errors;
mod message;
mod value_objects;

pub use errors::TransportError;
pub use message::{is_head_update_shape, GossipMessage};
pub use value_objects::*;
