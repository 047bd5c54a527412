//! Upstream client adapters
//!
//! One adapter per third-party provider. Each adapter handles its provider's
//! auth scheme, fetches listing pages concurrently, and normalizes the
//! provider-native JSON into [`ContentItem`].
//!
//! # Adapters
//! 1. **tmdb** - Movies and TV shows (bearer token)
//! 2. **books** - Google Books volumes (API key)
//! 3. **spotify** - New-release tracks (client-credentials token)
//!
//! # Partial failure
//! A single page or resource failure never aborts the aggregation: it is
//! recorded as a [`FetchDiagnostic`] and contributes zero items. Sibling
//! fetches are always allowed to settle. Authentication failures are the
//! exception and are returned as [`AdapterError::Auth`].

pub mod books;
pub mod spotify;
pub mod tmdb;
pub mod token;

use async_trait::async_trait;
use hrlb_common::{Category, ContentItem, TimeWindow};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

/// User-Agent sent with every upstream request
const USER_AGENT: &str = concat!("hrlb-server/", env!("CARGO_PKG_VERSION"));

/// Adapter errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Credentials missing or rejected (fatal for the whole request)
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl AdapterError {
    /// Fatal errors abort the aggregation instead of becoming diagnostics
    pub fn is_fatal(&self) -> bool {
        matches!(self, AdapterError::Auth(_))
    }
}

/// One swallowed upstream failure, reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchDiagnostic {
    /// Which fetch failed (e.g. "tmdb/movie page 3")
    pub source: String,
    pub message: String,
}

impl FetchDiagnostic {
    pub fn new(source: impl Into<String>, error: &AdapterError) -> Self {
        Self {
            source: source.into(),
            message: error.to_string(),
        }
    }
}

/// Normalized items plus the failures tolerated while fetching them
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<ContentItem>,
    pub diagnostics: Vec<FetchDiagnostic>,
}

/// Upstream provider adapter
///
/// Implementations must be cheap to share across requests (`Arc<dyn ContentAdapter>`).
#[async_trait]
pub trait ContentAdapter: Send + Sync {
    /// Adapter name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Category this adapter serves
    fn category(&self) -> Category;

    /// Fetch candidate items released inside `window`
    ///
    /// `page_budget` bounds how much listing data is pulled; its unit is
    /// provider specific (TMDB pages, Google Books pages per subject,
    /// Spotify release batch size).
    async fn fetch_ranked(
        &self,
        window: &TimeWindow,
        page_budget: usize,
    ) -> Result<FetchOutcome, AdapterError>;

    /// Resolve a single item by provider id (`None` when it does not exist)
    async fn fetch_item(&self, id: &str) -> Result<Option<ContentItem>, AdapterError>;

    /// Ranking comparator (smaller sorts first)
    fn compare(&self, a: &ContentItem, b: &ContentItem) -> Ordering {
        by_rating_desc(a, b)
    }
}

/// Highest rating first
pub fn by_rating_desc(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.rating.total_cmp(&a.rating)
}

/// Build the shared HTTP client used by every adapter
pub fn http_client(timeout: Duration) -> Result<Client, AdapterError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AdapterError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and decode a JSON body
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AdapterError> {
    match send_json_optional(request).await? {
        Some(body) => Ok(body),
        None => Err(AdapterError::Api(404, "Not found".to_string())),
    }
}

/// Like [`send_json`] but maps 404 to `None`
pub(crate) async fn send_json_optional<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Option<T>, AdapterError> {
    let response = request
        .send()
        .await
        .map_err(|e| AdapterError::Network(e.to_string()))?;

    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Auth(format!("upstream returned {}: {}", status, body)));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Api(status.as_u16(), body));
    }

    response
        .json::<T>()
        .await
        .map(Some)
        .map_err(|e| AdapterError::Parse(e.to_string()))
}

/// Drop repeated ids, keeping the first occurrence
pub(crate) fn dedupe_by_id(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

// ============================================================================
// Mock Adapter for Testing
// ============================================================================
