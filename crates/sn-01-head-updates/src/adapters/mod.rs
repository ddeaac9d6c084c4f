//! # Adapters
//!
//! In-process implementations of the outbound ports.

mod memory;

pub use memory::InMemoryContactRegistry;
