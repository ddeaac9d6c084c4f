//! # File-Backed Post Store
//!
//! One JSON file per post under `posts/`. Writes go to a temporary file
//! that is renamed into place, so a crash never leaves a torn record.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shared_types::{PostRecord, StoreError};
use sn_03_index_sync::adapters::sort_newest_first;
use sn_03_index_sync::PostStore;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Post store writing `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FsPostStore {
    dir: PathBuf,
}

impl FsPostStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the post with `id`.
    ///
    /// Ids come from remote indexes, so anything that is not a plain file
    /// name is replaced by its hash.
    pub fn path_for(&self, id: &str) -> PathBuf {
        let safe = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        let name = if safe {
            format!("{id}.json")
        } else {
            format!("h-{}.json", hex::encode(Sha256::digest(id.as_bytes())))
        };
        self.dir.join(name)
    }

    async fn write_record(&self, post: &PostRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(post).map_err(|e| StoreError::Io(e.to_string()))?;
        let path = self.path_for(&post.id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_record(path: &Path) -> Result<PostRecord, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PostStore for FsPostStore {
    async fn upsert_many(&self, posts: &[PostRecord]) -> Result<(), StoreError> {
        if posts.is_empty() {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        for post in posts {
            self.write_record(post).await?;
        }
        debug!(count = posts.len(), dir = %self.dir.display(), "Posts written");
        Ok(())
    }

    async fn list_by_author(&self, author: &str) -> Result<Vec<PostRecord>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut posts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(post) if post.author == author => posts.push(post),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable post"),
            }
        }
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn find(&self, id: &str) -> Result<Option<PostRecord>, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let post = Self::read_record(&path).await?;
        Ok((post.id == id).then_some(post))
    }
}
