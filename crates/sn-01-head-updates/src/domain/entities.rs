//! Pipeline outcomes and counters.

use serde::Serialize;
use shared_types::HeadUpdateEvent;
use thiserror::Error;

/// Why an inbound head update was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Missing or mistyped fields, wrong kind, unparsable `issuedAt`.
    #[error("malformed")]
    Malformed,
    /// Signature already in the replay cache.
    #[error("duplicate")]
    Duplicate,
    /// Signature does not verify against the embedded key.
    #[error("invalid-signature")]
    InvalidSignature,
    /// Source exceeded its per-window budget.
    #[error("rate-limited")]
    RateLimited,
    /// `issuedAt` outside the allowed clock skew.
    #[error("stale-or-future")]
    StaleOrFuture,
}

impl RejectReason {
    /// Reason string used in logs and stats.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Malformed => "malformed",
            RejectReason::Duplicate => "duplicate",
            RejectReason::InvalidSignature => "invalid-signature",
            RejectReason::RateLimited => "rate-limited",
            RejectReason::StaleOrFuture => "stale-or-future",
        }
    }
}

/// What the apply step did with an accepted update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadApplication {
    /// Contact head moved to `newHead`; a sync was scheduled.
    Updated,
    /// Contact already pointed at `newHead`.
    Unchanged,
    /// No contact follows this source.
    UnknownSource,
    /// The contact registry failed; the update may be redelivered.
    StoreUnavailable(String),
}

/// Terminal state of one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Passed every check.
    Accepted(HeadApplication),
    /// Dropped.
    Rejected(RejectReason),
}

impl PipelineOutcome {
    /// True for `Accepted(_)`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PipelineOutcome::Accepted(_))
    }

    /// Rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            PipelineOutcome::Rejected(reason) => Some(*reason),
            PipelineOutcome::Accepted(_) => None,
        }
    }
}

/// An accepted update as seen by local subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedHeadUpdate {
    /// The verified event.
    pub event: HeadUpdateEvent,
    /// Effect on contact state.
    pub application: HeadApplication,
}

/// Outcome counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub accepted: u64,
    pub heads_updated: u64,
    pub malformed: u64,
    pub duplicate: u64,
    pub invalid_signature: u64,
    pub rate_limited: u64,
    pub stale_or_future: u64,
}

impl PipelineStats {
    /// Count one outcome.
    pub fn record(&mut self, outcome: &PipelineOutcome) {
        match outcome {
            PipelineOutcome::Accepted(application) => {
                self.accepted += 1;
                if *application == HeadApplication::Updated {
                    self.heads_updated += 1;
                }
            }
            PipelineOutcome::Rejected(reason) => match reason {
                RejectReason::Malformed => self.malformed += 1,
                RejectReason::Duplicate => self.duplicate += 1,
                RejectReason::InvalidSignature => self.invalid_signature += 1,
                RejectReason::RateLimited => self.rate_limited += 1,
                RejectReason::StaleOrFuture => self.stale_or_future += 1,
            },
        }
    }

    /// Total rejected messages.
    pub fn rejected(&self) -> u64 {
        self.malformed
            + self.duplicate
            + self.invalid_signature
            + self.rate_limited
            + self.stale_or_future
    }
}
