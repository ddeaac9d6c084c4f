//! # Core Domain Entities
//!
//! Defines the records exchanged by peers and kept in local state.
//!
//! ## Clusters
//!
//! - **Signed events**: `HeadUpdateEvent`, `ContentEvent`
//! - **Post index chain**: `IndexSnapshot`, `IndexEntry`
//! - **Local state**: `Contact`, `PostRecord`
//!
//! Signed events keep their timestamps as the exact strings that were
//! signed; unsigned records use parsed `DateTime<Utc>` values.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::Canonical;

/// Protocol version stamped on every event this node produces.
pub const EVENT_VERSION: u32 = 1;

/// `kind` of a head-update event.
pub const HEAD_UPDATE_KIND: &str = "postIndexHeadUpdate";

/// `kind` of a post content event.
pub const POST_KIND: &str = "post";

/// Locator understood by the content-addressed store (e.g. a magnet URI).
pub type Locator = String;

/// Identifier of a publishing identity.
pub type SourceId = String;

/// Untyped event as delivered by a transport, before shape checking.
pub type RawEvent = serde_json::Value;

/// Format a timestamp the way events carry it (RFC 3339, millisecond
/// precision, `Z` suffix).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp carried by an event.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// =============================================================================
// CLUSTER A: SIGNED EVENTS
// =============================================================================

/// Signed pointer to the latest index snapshot of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadUpdateEvent {
    /// Event schema version.
    pub version: u32,
    /// Always [`HEAD_UPDATE_KIND`].
    pub kind: String,
    /// Publishing identity (not necessarily derived from the key).
    pub source_id: SourceId,
    /// Base64 Ed25519 public key of the signer.
    pub author_public_key: String,
    /// Head this update replaces, absent for the first snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_head: Option<Locator>,
    /// Locator of the new head snapshot.
    pub new_head: Locator,
    /// Number of entries in the new head snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
    /// Creation time of the newest entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_item_timestamp: Option<String>,
    /// When the update was signed.
    pub issued_at: String,
    /// Base64 signature over the canonical encoding.
    #[serde(default)]
    pub signature: String,
}

impl Canonical for HeadUpdateEvent {
    const FIELD_ORDER: &'static [&'static str] = &[
        "version",
        "kind",
        "sourceId",
        "authorPublicKey",
        "previousHead",
        "newHead",
        "itemCount",
        "lastItemTimestamp",
        "issuedAt",
    ];
}

impl HeadUpdateEvent {
    /// Parsed `issuedAt`, if well formed.
    pub fn issued_at_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.issued_at)
    }
}

/// A head update as handed in by the application, before the local key
/// is attached and the event is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadUpdateDraft {
    /// Publishing identity.
    pub source_id: SourceId,
    /// Head being replaced.
    pub previous_head: Option<Locator>,
    /// New head locator.
    pub new_head: Locator,
    /// Entry count of the new head snapshot.
    pub item_count: Option<u64>,
    /// Newest entry timestamp.
    pub last_item_timestamp: Option<DateTime<Utc>>,
    /// Signing time.
    pub issued_at: DateTime<Utc>,
}

impl HeadUpdateDraft {
    /// Attach the signer's key, leaving the signature empty.
    pub fn into_unsigned(self, author_public_key: String) -> HeadUpdateEvent {
        HeadUpdateEvent {
            version: EVENT_VERSION,
            kind: HEAD_UPDATE_KIND.to_string(),
            source_id: self.source_id,
            author_public_key,
            previous_head: self.previous_head,
            new_head: self.new_head,
            item_count: self.item_count,
            last_item_timestamp: self.last_item_timestamp.map(format_timestamp),
            issued_at: format_timestamp(self.issued_at),
            signature: String::new(),
        }
    }
}

/// Signed content item (a post).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEvent {
    /// Event schema version.
    pub version: u32,
    /// Content kind, e.g. [`POST_KIND`].
    pub kind: String,
    /// Base64 public key of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_public_key: Option<String>,
    /// Creation time as signed.
    pub created_at: String,
    /// Text body.
    pub body: String,
    /// Locators or hashes of attached blobs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Thread root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Direct parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Base64 signature over the canonical encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Canonical for ContentEvent {
    const FIELD_ORDER: &'static [&'static str] = &[
        "version",
        "kind",
        "authorPublicKey",
        "createdAt",
        "body",
        "attachments",
        "parentId",
        "replyTo",
    ];
}

impl ContentEvent {
    /// Unsigned post with the given body.
    pub fn post(body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            version: EVENT_VERSION,
            kind: POST_KIND.to_string(),
            author_public_key: None,
            created_at: format_timestamp(created_at),
            body: body.into(),
            attachments: Vec::new(),
            parent_id: None,
            reply_to: None,
            signature: None,
        }
    }
}

// =============================================================================
// CLUSTER B: POST INDEX CHAIN
// =============================================================================

/// Summary of one content item inside an index snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Content id (dedup key).
    pub id: String,
    /// Author identity.
    pub author: SourceId,
    /// Creation time of the content.
    pub created_at: DateTime<Utc>,
    /// Where the content event can be fetched.
    pub content_locator: Locator,
}

/// One link of the backward chain `head → snapshot → previous → … → none`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    /// Recent entries, newest first.
    pub entries: Vec<IndexEntry>,
    /// Locator of the prior snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_snapshot_locator: Option<Locator>,
}

// =============================================================================
// CLUSTER C: LOCAL STATE
// =============================================================================

/// A followed identity. Only `current_head_locator` is written by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Identity whose head updates this contact follows.
    pub source_id: SourceId,
    /// Latest known head of the contact's index chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_head_locator: Option<Locator>,
    /// Maximum entries collected per sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_max_items: Option<usize>,
    /// How far back a sync reaches, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_lookback_secs: Option<u64>,
}

impl Contact {
    /// Contact with no head and default sync bounds.
    pub fn new(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: source_id.into(),
            current_head_locator: None,
            sync_max_items: None,
            sync_lookback_secs: None,
        }
    }
}

/// Whether a post's content could be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Availability {
    /// Content fetched and decoded.
    #[default]
    Available,
    /// Fetch failed or timed out; the record is a placeholder.
    Unavailable {
        /// Why the fetch failed.
        reason: String,
    },
}

/// Lifecycle of a locally authored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum PublishState {
    /// Signed and stored locally, not yet published.
    Pending,
    /// Content, snapshot and head update published.
    Committed,
    /// Publishing failed.
    Failed {
        /// Failure description.
        reason: String,
    },
}

/// A post in local state, authored locally or merged from a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    /// Content id.
    pub id: String,
    /// Author identity.
    pub author: SourceId,
    /// Post body (empty for placeholders).
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Attached locators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    /// Base64 signature of the content event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Base64 public key of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_public_key: Option<String>,
    /// Where the content event lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_locator: Option<Locator>,
    /// Verification result, absent until checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_verified: Option<bool>,
    /// Reason verification failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_error: Option<String>,
    /// Display fingerprint of the author key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Content availability.
    #[serde(default)]
    pub availability: Availability,
    /// Publish phase, only set for locally authored posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_state: Option<PublishState>,
}

impl PostRecord {
    /// Placeholder for an entry whose content could not be fetched.
    pub fn placeholder(entry: &IndexEntry, reason: impl Into<String>) -> Self {
        Self {
            id: entry.id.clone(),
            author: entry.author.clone(),
            content: String::new(),
            created_at: entry.created_at,
            attachments: Vec::new(),
            signature: None,
            author_public_key: None,
            content_locator: Some(entry.content_locator.clone()),
            signature_verified: None,
            signature_error: None,
            fingerprint: None,
            availability: Availability::Unavailable {
                reason: reason.into(),
            },
            publish_state: None,
        }
    }

    /// True if this record stands in for unreachable content.
    pub fn is_placeholder(&self) -> bool {
        matches!(self.availability, Availability::Unavailable { .. })
    }

    /// Index summary of this post, if it has a content locator.
    pub fn index_entry(&self) -> Option<IndexEntry> {
        self.content_locator.as_ref().map(|locator| IndexEntry {
            id: self.id.clone(),
            author: self.author.clone(),
            created_at: self.created_at,
            content_locator: locator.clone(),
        })
    }
}
