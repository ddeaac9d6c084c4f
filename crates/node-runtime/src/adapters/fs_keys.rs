//! # File-Backed Key Storage
//!
//! Keeps the local keypair as a JSON file in the data directory.

use async_trait::async_trait;
use shared_crypto::{KeyStorage, StoredKeypair, KEYPAIR_STORAGE_KEY};
use shared_types::StoreError;
use std::path::PathBuf;
use tracing::info;

/// Key storage over a single JSON file.
#[derive(Debug, Clone)]
pub struct FsKeyStorage {
    path: PathBuf,
}

impl FsKeyStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeyStorage for FsKeyStorage {
    async fn load_keypair(&self) -> Result<Option<StoredKeypair>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: KEYPAIR_STORAGE_KEY.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save_keypair(&self, keypair: &StoredKeypair) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(keypair).map_err(|e| StoreError::Io(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), "Keypair saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{Ed25519Signer, KeyProvisioning, SignatureService};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_slot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsKeyStorage::new(dir.path().join("keypair.json"));
        assert_eq!(storage.load_keypair().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsKeyStorage::new(dir.path().join("nested").join("keypair.json"));
        let keypair = StoredKeypair {
            public_key: "cHVi".to_string(),
            secret_key: "c2Vj".to_string(),
        };
        storage.save_keypair(&keypair).await.unwrap();
        assert_eq!(storage.load_keypair().await.unwrap(), Some(keypair));
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keypair.json");
        std::fs::write(&path, b"not a keypair").unwrap();
        let storage = FsKeyStorage::new(path);
        assert!(matches!(
            storage.load_keypair().await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_signer_key_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keypair.json");

        let first = Ed25519Signer::new(Arc::new(FsKeyStorage::new(&path)), KeyProvisioning::Lazy);
        let public_key = first.public_key().await.unwrap();

        let second =
            Ed25519Signer::new(Arc::new(FsKeyStorage::new(&path)), KeyProvisioning::Existing);
        assert_eq!(second.public_key().await.unwrap(), public_key);
    }
}
