//! # Domain Layer for Head Updates
//!
//! Pure logic with no I/O dependencies. This is the innermost layer
//! of the hexagonal architecture.
//!
//! ## Contents
//!
//! - **entities**: Pipeline outcomes and statistics (`PipelineOutcome`, `RejectReason`)
//! - **value_objects**: Configuration and bounded state (`PipelineConfig`, `ReplayCache`, `SourceRateLimiter`)
//! - **invariants**: Shape and freshness checks on inbound events

mod entities;
mod invariants;
mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use value_objects::*;
