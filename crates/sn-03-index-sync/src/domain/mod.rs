//! # Index Sync Domain
//!
//! Sync bounds, reports, and error types.

mod errors;
mod value_objects;

pub use errors::{ContentStoreError, PublishError, SyncError};
pub use value_objects::*;
