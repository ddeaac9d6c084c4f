//! # File-Backed Head Store
//!
//! Remembers the head of the local index chain across restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Locator, StoreError};
use sn_03_index_sync::HeadStore;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeadFile {
    head: Locator,
    updated_at: DateTime<Utc>,
}

/// Head store over a single JSON file.
#[derive(Debug, Clone)]
pub struct FsHeadStore {
    path: PathBuf,
}

impl FsHeadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HeadStore for FsHeadStore {
    async fn load_head(&self) -> Result<Option<Locator>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: HeadFile = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(file.head))
    }

    async fn save_head(&self, head: &Locator) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = HeadFile {
            head: head.clone(),
            updated_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(head = %head, path = %self.path.display(), "Local head saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_no_head() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsHeadStore::new(dir.path().join("head.json"));
        assert_eq!(store.load_head().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_head() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsHeadStore::new(dir.path().join("data").join("head.json"));
        store.save_head(&"sn:sha256:aa".to_string()).await.unwrap();
        store.save_head(&"sn:sha256:bb".to_string()).await.unwrap();

        let reopened = FsHeadStore::new(dir.path().join("data").join("head.json"));
        assert_eq!(
            reopened.load_head().await.unwrap(),
            Some("sn:sha256:bb".to_string())
        );
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            FsHeadStore::new(path).load_head().await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
