//! # Ports Layer
//!
//! - **Inbound**: [`IndexSyncApi`] and [`IndexPublishApi`], driven by the
//!   runtime and the sync scheduler
//! - **Outbound**: the content-addressed store, the local post store, and
//!   the head-update broadcaster, and the local head slot

pub mod inbound;
pub mod outbound;

pub use inbound::{IndexPublishApi, IndexSyncApi};
pub use outbound::{ContentStore, HeadBroadcaster, HeadStore, PostStore};
