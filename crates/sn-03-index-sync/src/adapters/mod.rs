//! # Adapters
//!
//! In-memory implementations of the content, post and head stores.

pub mod memory;

pub use memory::{
    content_locator, sort_newest_first, InMemoryContentStore, InMemoryHeadStore, InMemoryPostStore,
    LOCATOR_PREFIX,
};
