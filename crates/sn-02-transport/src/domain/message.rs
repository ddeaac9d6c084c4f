//! # Gossip Messages
//!
//! Payloads arrive from the pub/sub node as raw bytes. The gossip transport
//! only hands them on when they decode as JSON and look like a signed head
//! update.

use shared_types::{RawEvent, HEAD_UPDATE_KIND};

/// Payload delivered from a pub/sub node to its owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GossipMessage {
    pub topic: String,
    pub data: Vec<u8>,
}

/// Minimal check applied to gossip payloads before they reach
/// subscribers: a head-update `kind` and a non-empty `signature`.
pub fn is_head_update_shape(raw: &RawEvent) -> bool {
    let kind_ok = raw.get("kind").and_then(|k| k.as_str()) == Some(HEAD_UPDATE_KIND);
    let signed = raw
        .get("signature")
        .and_then(|s| s.as_str())
        .is_some_and(|s| !s.is_empty());
    kind_ok && signed
}
