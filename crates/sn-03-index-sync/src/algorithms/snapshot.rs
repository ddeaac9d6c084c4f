//! # Snapshot Building
//!
//! The next snapshot lists the newest published posts of the identity and
//! links back to the current head.

use shared_types::{IndexSnapshot, Locator, PostRecord, PublishState};

/// True if a local post belongs in a published snapshot.
fn is_publishable(post: &PostRecord) -> bool {
    post.content_locator.is_some()
        && !post.is_placeholder()
        && !matches!(post.publish_state, Some(PublishState::Failed { .. }))
}

/// Build the next snapshot from `posts`, newest first, at most
/// `max_entries` long.
pub fn build_snapshot(
    posts: &[PostRecord],
    previous_head: Option<Locator>,
    max_entries: usize,
) -> IndexSnapshot {
    let mut entries: Vec<_> = posts
        .iter()
        .filter(|post| is_publishable(post))
        .filter_map(PostRecord::index_entry)
        .collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    entries.truncate(max_entries);

    IndexSnapshot {
        entries,
        previous_snapshot_locator: previous_head,
    }
}
