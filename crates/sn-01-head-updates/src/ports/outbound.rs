//! Outbound ports (SPI) for the head-update pipeline.

use async_trait::async_trait;
use shared_types::{Contact, Locator, StoreError};

/// Contact registry collaborator.
///
/// The pipeline only reads contacts and moves head locators; everything
/// else about a contact belongs to the application.
#[async_trait]
pub trait ContactRegistry: Send + Sync {
    /// All followed contacts.
    async fn list(&self) -> Result<Vec<Contact>, StoreError>;

    /// Contact following `source_id`, if any.
    async fn get(&self, source_id: &str) -> Result<Option<Contact>, StoreError>;

    /// Move a contact's head locator.
    async fn set_head_locator(&self, source_id: &str, locator: &Locator) -> Result<(), StoreError>;
}

/// Schedules a sync of one contact. Must not block.
pub trait SyncTrigger: Send + Sync {
    /// Queue a sync for `source_id`.
    fn request_sync(&self, source_id: &str);
}
