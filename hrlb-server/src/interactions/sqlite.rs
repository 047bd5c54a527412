//! SQLite-backed interaction store
//!
//! A single `documents` table emulates the document store: one row per
//! (collection path, key) with the record serialized as JSON.

use super::{InteractionStore, StoreError, interactions_path};
use async_trait::async_trait;
use chrono::Utc;
use hrlb_common::UserInteraction;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteInteractionStore {
    pool: SqlitePool,
}

impl SqliteInteractionStore {
    /// Open (creating if needed) the database at `db_path`
    pub async fn connect(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(e.into()))?;
            }
        }

        // Filename, not URL: paths may contain '?' or '#'
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        debug!("Connecting to interactions database: {}", db_path.display());

        let pool = SqlitePool::connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database (one connection, so every query sees it)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (path, key)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Interactions database initialized");
        Ok(Self { pool })
    }

    async fn put(&self, path: &str, key: &str, record: &UserInteraction) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;

        sqlx::query(
            "INSERT OR REPLACE INTO documents (path, key, body, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(path)
        .bind(key)
        .bind(body)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl InteractionStore for SqliteInteractionStore {
    async fn get(&self, user_id: &str) -> Result<Vec<UserInteraction>, StoreError> {
        let bodies: Vec<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE path = ? ORDER BY key")
                .bind(interactions_path(user_id))
                .fetch_all(&self.pool)
                .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StoreError::from))
            .collect()
    }

    async fn create(&self, path: &str, record: &UserInteraction) -> Result<(), StoreError> {
        self.put(path, &record.content_id, record).await
    }

    async fn update(&self, path: &str, key: &str, record: &UserInteraction) -> Result<(), StoreError> {
        self.put(path, key, record).await
    }
}
