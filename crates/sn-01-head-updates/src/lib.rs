//! # Head-Update Pipeline Subsystem (sn-01)
//!
//! Validates signed head updates arriving from the broadcast transport
//! and applies accepted ones to contact state.
//!
//! ## Architecture Role
//!
//! ```text
//! [Transport (2)] ──raw event──→ [Head-Update Pipeline (1)]
//!                                        │
//!                         shape → dedup → verify → rate → fresh
//!                                        │
//!                                        ↓ apply
//!                      [Contact Registry]  +  [Index Sync (3)] (scheduled)
//! ```
//!
//! ## Security
//!
//! - Signatures are checked over the canonical encoding of exactly the
//!   fields received
//! - Replayed signatures are dropped silently
//! - Each source gets a bounded number of updates per window

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::InMemoryContactRegistry;
pub use domain::*;
pub use ports::inbound::HeadUpdateApi;
pub use ports::outbound::{ContactRegistry, SyncTrigger};
pub use service::HeadUpdatePipeline;
