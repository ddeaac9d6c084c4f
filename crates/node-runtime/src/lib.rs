//! # Node Runtime Library
//!
//! Wiring of the SnartNet subsystems into a runnable node. The main entry
//! point is the `node-runtime` binary; [`SnartnetNode`] is the API offered
//! to applications and integration tests.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `container` | Configuration and the adapters a node is built from |
//! | `adapters` | File-backed post store and key storage, transport wiring |
//! | `node` | The node facade |
//! | `logging` | Global `tracing` subscriber |

#![warn(missing_docs)]
#![allow(missing_docs)] // TODO: document the facade accessors
#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod logging;
pub mod node;

pub use container::{ConfigError, NodeComponents, NodeConfig};
pub use logging::init_logging;
pub use node::SnartnetNode;
