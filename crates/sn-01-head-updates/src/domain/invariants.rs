//! # Inbound Checks
//!
//! Shape and freshness checks run on every inbound head update before it
//! can touch contact state.

use chrono::{DateTime, Duration, Utc};
use shared_types::{HeadUpdateEvent, RawEvent, HEAD_UPDATE_KIND};

use super::RejectReason;

/// Parse and shape-check a raw inbound event.
///
/// Requires a JSON object of kind `postIndexHeadUpdate` with non-empty
/// `sourceId`, `authorPublicKey`, `newHead` and `signature`, a numeric
/// `version`, and an RFC 3339 `issuedAt`.
pub fn check_shape(raw: &RawEvent) -> Result<HeadUpdateEvent, RejectReason> {
    if !raw.is_object() {
        return Err(RejectReason::Malformed);
    }
    let event: HeadUpdateEvent =
        serde_json::from_value(raw.clone()).map_err(|_| RejectReason::Malformed)?;

    let required = [
        &event.source_id,
        &event.author_public_key,
        &event.new_head,
        &event.signature,
    ];
    if event.kind != HEAD_UPDATE_KIND || required.iter().any(|field| field.is_empty()) {
        return Err(RejectReason::Malformed);
    }
    if event.issued_at_time().is_none() {
        return Err(RejectReason::Malformed);
    }
    Ok(event)
}

/// True when `issued_at` is within `max_skew` of `now`, bounds inclusive.
pub fn is_fresh(issued_at: DateTime<Utc>, now: DateTime<Utc>, max_skew: Duration) -> bool {
    (now - issued_at).abs() <= max_skew
}
