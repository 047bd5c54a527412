//! In-process interaction store (default when no database is configured)

use super::{InteractionStore, StoreError, interactions_path};
use async_trait::async_trait;
use hrlb_common::UserInteraction;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// path → key → record
#[derive(Default)]
pub struct MemoryInteractionStore {
    documents: RwLock<HashMap<String, BTreeMap<String, UserInteraction>>>,
}

impl MemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStore for MemoryInteractionStore {
    async fn get(&self, user_id: &str) -> Result<Vec<UserInteraction>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&interactions_path(user_id))
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, path: &str, record: &UserInteraction) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .insert(record.content_id.clone(), record.clone());
        Ok(())
    }

    async fn update(&self, path: &str, key: &str, record: &UserInteraction) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .entry(path.to_string())
            .or_default()
            .insert(key.to_string(), record.clone());
        Ok(())
    }
}
