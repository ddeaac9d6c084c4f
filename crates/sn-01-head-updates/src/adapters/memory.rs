//! In-memory contact registry.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Contact, Locator, StoreError};
use std::collections::HashMap;

use crate::ports::outbound::ContactRegistry;

/// Contact registry held in memory, keyed by source id.
#[derive(Debug, Default)]
pub struct InMemoryContactRegistry {
    contacts: RwLock<HashMap<String, Contact>>,
}

impl InMemoryContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with contacts.
    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let registry = Self::new();
        for contact in contacts {
            registry.upsert(contact);
        }
        registry
    }

    /// Add or replace a contact.
    pub fn upsert(&self, contact: Contact) {
        self.contacts
            .write()
            .insert(contact.source_id.clone(), contact);
    }

    /// Stop following a source.
    pub fn remove(&self, source_id: &str) -> Option<Contact> {
        self.contacts.write().remove(source_id)
    }

    /// Current head of a contact.
    pub fn head_of(&self, source_id: &str) -> Option<Locator> {
        self.contacts
            .read()
            .get(source_id)
            .and_then(|c| c.current_head_locator.clone())
    }
}

#[async_trait]
impl ContactRegistry for InMemoryContactRegistry {
    async fn list(&self) -> Result<Vec<Contact>, StoreError> {
        let mut contacts: Vec<Contact> = self.contacts.read().values().cloned().collect();
        contacts.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(contacts)
    }

    async fn get(&self, source_id: &str) -> Result<Option<Contact>, StoreError> {
        Ok(self.contacts.read().get(source_id).cloned())
    }

    async fn set_head_locator(&self, source_id: &str, locator: &Locator) -> Result<(), StoreError> {
        let mut contacts = self.contacts.write();
        let contact = contacts
            .get_mut(source_id)
            .ok_or_else(|| StoreError::NotFound(source_id.to_string()))?;
        contact.current_head_locator = Some(locator.clone());
        Ok(())
    }
}
