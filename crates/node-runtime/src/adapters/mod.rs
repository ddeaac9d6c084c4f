//! # Runtime Adapters
//!
//! Implementations of subsystem ports that need the filesystem or the
//! node's transport.

pub mod fs_head;
pub mod fs_keys;
pub mod fs_posts;
pub mod transport;

pub use fs_head::FsHeadStore;
pub use fs_keys::FsKeyStorage;
pub use fs_posts::FsPostStore;
pub use transport::{TransportBroadcaster, TransportHandle};
