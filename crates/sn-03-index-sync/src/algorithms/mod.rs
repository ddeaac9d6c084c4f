//! # Algorithms
//!
//! - `chain_walk`: bounded backward walk of a contact's index chain
//! - `snapshot`: building the local identity's next snapshot
//! - `verify`: decoding and verifying fetched content items

pub mod chain_walk;
pub mod snapshot;
pub mod verify;

pub use chain_walk::{fetch_json, fetch_with_timeout, walk_chain, ChainWalk};
pub use snapshot::build_snapshot;
pub use verify::{verified_record, ContentVerdict};
