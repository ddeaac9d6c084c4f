//! # Key Storage Port
//!
//! Persistence of the local signing keypair is delegated to a collaborator
//! implementing [`KeyStorage`]. The runtime provides a file-backed adapter;
//! [`InMemoryKeyStorage`] serves tests and ephemeral nodes.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::StoreError;

/// Storage slot name of the local keypair.
pub const KEYPAIR_STORAGE_KEY: &str = "snartnet:ed25519:keypair:v1";

/// Persisted keypair, both halves standard base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeypair {
    /// Raw 32-byte public key.
    pub public_key: String,
    /// Raw 32-byte secret seed.
    pub secret_key: String,
}

impl std::fmt::Debug for StoredKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKeypair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Outbound port: persistent key storage.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    /// Load the stored keypair, `None` if the slot is empty.
    ///
    /// A slot that exists but cannot be decoded is `StoreError::Corrupt`.
    async fn load_keypair(&self) -> Result<Option<StoredKeypair>, StoreError>;

    /// Persist the keypair, replacing any previous one.
    async fn save_keypair(&self, keypair: &StoredKeypair) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
enum Slot {
    Empty,
    Stored(StoredKeypair),
    Corrupt,
}

/// Volatile key storage.
#[derive(Debug)]
pub struct InMemoryKeyStorage {
    slot: Mutex<Slot>,
    saves: Mutex<usize>,
}

impl InMemoryKeyStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            saves: Mutex::new(0),
        }
    }

    /// Storage pre-populated with a keypair.
    pub fn with_keypair(keypair: StoredKeypair) -> Self {
        Self {
            slot: Mutex::new(Slot::Stored(keypair)),
            saves: Mutex::new(0),
        }
    }

    /// Storage whose slot holds undecodable data.
    pub fn corrupt() -> Self {
        Self {
            slot: Mutex::new(Slot::Corrupt),
            saves: Mutex::new(0),
        }
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Currently stored keypair.
    pub fn stored(&self) -> Option<StoredKeypair> {
        match &*self.slot.lock() {
            Slot::Stored(kp) => Some(kp.clone()),
            _ => None,
        }
    }
}

impl Default for InMemoryKeyStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStorage for InMemoryKeyStorage {
    async fn load_keypair(&self) -> Result<Option<StoredKeypair>, StoreError> {
        match &*self.slot.lock() {
            Slot::Empty => Ok(None),
            Slot::Stored(kp) => Ok(Some(kp.clone())),
            Slot::Corrupt => Err(StoreError::Corrupt {
                key: KEYPAIR_STORAGE_KEY.to_string(),
                reason: "undecodable keypair".to_string(),
            }),
        }
    }

    async fn save_keypair(&self, keypair: &StoredKeypair) -> Result<(), StoreError> {
        *self.slot.lock() = Slot::Stored(keypair.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}
