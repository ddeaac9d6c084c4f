//! # Node Container
//!
//! Configuration plus the set of adapters a node is assembled from.

pub mod components;
pub mod config;

pub use components::NodeComponents;
pub use config::{ConfigError, NodeConfig};
