//! # Shared Types Crate
//!
//! This crate contains the records exchanged between peers and between
//! subsystems, and the canonical encoding that every signature covers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Wire-compatible JSON**: Field names are camelCase and optional fields
//!   are omitted rather than serialized as `null`.
//! - **Signatures cover canonical bytes only**: See [`canonical`].

pub mod canonical;
pub mod clock;
pub mod entities;
pub mod errors;

pub use canonical::{canonicalize, canonicalize_value, Canonical};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-utils"))]
pub use clock::ManualClock;
pub use entities::*;
pub use errors::*;
