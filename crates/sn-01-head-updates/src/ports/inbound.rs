//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of this subsystem.

use async_trait::async_trait;
use shared_bus::Subscription;
use shared_types::RawEvent;

use crate::domain::{AcceptedHeadUpdate, PipelineOutcome, PipelineStats};

/// Entry point for inbound head updates.
///
/// Implementations must be thread-safe (`Send + Sync`). A message that
/// fails any check is dropped and reported in the outcome; processing
/// never fails as a whole.
#[async_trait]
pub trait HeadUpdateApi: Send + Sync {
    /// Run one raw event through every check and the apply step.
    async fn process(&self, raw: RawEvent) -> PipelineOutcome;

    /// Subscribe to accepted updates.
    fn subscribe_accepted(&self) -> Subscription<AcceptedHeadUpdate>;

    /// Snapshot of outcome counters.
    fn stats(&self) -> PipelineStats;
}
