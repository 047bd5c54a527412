//! Interaction store gateway
//!
//! Per-user engagement records (bookmarks, likes, list membership, views,
//! ratings) kept in a document store. Documents live under
//! `users/{userId}/interactions` and are keyed by content id. Writes are
//! last-write-wins per key; there are no transactions.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryInteractionStore;
pub use sqlite::SqliteInteractionStore;

use async_trait::async_trait;
use chrono::Utc;
use hrlb_common::UserInteraction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Highest accepted star rating
pub const MAX_RATING: f64 = 10.0;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from applying a user action
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Rating {0} is outside [0, 10]")]
    InvalidRating(f64),

    #[error("The rate action requires a rating")]
    MissingRating,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Document store holding interaction records
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Every interaction recorded for `user_id`
    async fn get(&self, user_id: &str) -> Result<Vec<UserInteraction>, StoreError>;

    /// Add a new record under `path`, keyed by its content id
    async fn create(&self, path: &str, record: &UserInteraction) -> Result<(), StoreError>;

    /// Overwrite the record stored under `path`/`key`
    async fn update(&self, path: &str, key: &str, record: &UserInteraction) -> Result<(), StoreError>;
}

/// Collection path for a user's interactions
pub fn interactions_path(user_id: &str) -> String {
    format!("users/{}/interactions", user_id)
}

/// User-initiated change to an interaction record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Bookmark,
    Like,
    List,
    View,
    Rate,
}

impl InteractionAction {
    /// Apply the action to a record in place
    ///
    /// `rating` is only consulted by [`InteractionAction::Rate`].
    pub fn apply(&self, record: &mut UserInteraction, rating: Option<f64>) -> Result<(), ActionError> {
        match self {
            InteractionAction::Bookmark => record.bookmarked = !record.bookmarked,
            InteractionAction::Like => record.liked = !record.liked,
            InteractionAction::List => record.in_list = !record.in_list,
            InteractionAction::View => {
                record.viewed = true;
                record.view_count = record.view_count.saturating_add(1);
            }
            InteractionAction::Rate => {
                let rating = rating.ok_or(ActionError::MissingRating)?;
                if !(0.0..=MAX_RATING).contains(&rating) {
                    return Err(ActionError::InvalidRating(rating));
                }
                record.rating = rating;
            }
        }
        record.timestamp = Utc::now().timestamp_millis();
        Ok(())
    }
}

/// Single record for (user, content), if one exists
pub async fn find_interaction(
    store: &dyn InteractionStore,
    user_id: &str,
    content_id: &str,
) -> Result<Option<UserInteraction>, StoreError> {
    Ok(store
        .get(user_id)
        .await?
        .into_iter()
        .find(|record| record.content_id == content_id))
}

/// Apply `action` for (user, content), creating the record on first use
pub async fn record_action(
    store: &dyn InteractionStore,
    user_id: &str,
    content_id: &str,
    action: InteractionAction,
    rating: Option<f64>,
) -> Result<UserInteraction, ActionError> {
    let path = interactions_path(user_id);

    match find_interaction(store, user_id, content_id).await? {
        Some(mut record) => {
            action.apply(&mut record, rating)?;
            store.update(&path, content_id, &record).await?;
            debug!(user_id, content_id, ?action, "Updated interaction");
            Ok(record)
        }
        None => {
            let mut record = UserInteraction::new(user_id, content_id);
            action.apply(&mut record, rating)?;
            store.create(&path, &record).await?;
            debug!(user_id, content_id, ?action, "Created interaction");
            Ok(record)
        }
    }
}
