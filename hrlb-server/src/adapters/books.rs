//! Google Books adapter
//!
//! Leaderboard candidates come from a small fixed set of subject queries
//! fetched in parallel, which diversifies results across genres. Only
//! volumes passing [`is_eligible`] are ranked.
//!
//! # API Reference
//! - Search: `GET /volumes?q=...&startIndex=..&maxResults=..&key=..`
//! - Volume: `GET /volumes/{id}?key=..`

use super::{
    by_rating_desc, dedupe_by_id, send_json, send_json_optional, AdapterError, ContentAdapter,
    FetchDiagnostic, FetchOutcome,
};
use async_trait::async_trait;
use futures::future::join_all;
use hrlb_common::content::PLACEHOLDER_IMAGE_URL;
use hrlb_common::{Category, ContentItem, TimeWindow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Google Books API base URL
const GOOGLE_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1";

/// Volumes requested per subject page
pub const RESULTS_PER_PAGE: usize = 20;

/// Google Books rejects `maxResults` above 40
pub const MAX_SEARCH_RESULTS: u32 = 40;

/// Subject queries and their ordering
pub const SUBJECT_QUERIES: [(&str, &str); 3] = [
    ("subject:fiction", "newest"),
    ("subject:literature", "relevance"),
    ("subject:mystery", "newest"),
];

/// Book as returned by the `/books` search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u64>,
    pub image_links: ImageLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small_thumbnail: Option<String>,
}

/// Google Books adapter
pub struct BooksAdapter {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BooksAdapter {
    pub fn new(http_client: Client, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: GOOGLE_BOOKS_API_URL.to_string(),
            api_key,
        }
    }

    /// Point the adapter at a different API root (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn key(&self) -> Result<&str, AdapterError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AdapterError::Auth("Google Books API key not configured".to_string()))
    }

    /// Run one volume query
    async fn query_volumes(
        &self,
        key: &str,
        q: &str,
        order_by: Option<&str>,
        start_index: usize,
        max_results: u32,
    ) -> Result<Vec<Volume>, AdapterError> {
        let url = format!("{}/volumes", self.base_url);
        let mut query = vec![
            ("q", q.to_string()),
            ("startIndex", start_index.to_string()),
            ("maxResults", max_results.to_string()),
            ("key", key.to_string()),
        ];
        if let Some(order_by) = order_by {
            query.push(("orderBy", order_by.to_string()));
        }

        debug!(q, start_index, max_results, "Querying Google Books");

        let body: VolumeList = send_json(self.http_client.get(&url).query(&query))
            .await
            .map_err(key_rejection)?;
        Ok(body.items)
    }

    /// Free-text book search backing the `/books` endpoint
    pub async fn search_books(&self, q: &str, max_results: u32) -> Result<Vec<Book>, AdapterError> {
        let key = self.key()?;
        let max_results = max_results.clamp(1, MAX_SEARCH_RESULTS);
        let volumes = self.query_volumes(key, q, None, 0, max_results).await?;
        Ok(volumes.into_iter().map(Book::from).collect())
    }
}

#[async_trait]
impl ContentAdapter for BooksAdapter {
    fn name(&self) -> &'static str {
        "Google Books"
    }

    fn category(&self) -> Category {
        Category::Book
    }

    async fn fetch_ranked(
        &self,
        window: &TimeWindow,
        page_budget: usize,
    ) -> Result<FetchOutcome, AdapterError> {
        let key = self.key()?;

        let requests: Vec<(&str, &str, usize)> = SUBJECT_QUERIES
            .iter()
            .flat_map(|&(subject, order_by)| {
                (0..page_budget).map(move |page| (subject, order_by, page * RESULTS_PER_PAGE))
            })
            .collect();

        info!(
            start = %window.start,
            end = %window.end,
            queries = requests.len(),
            "Fetching Google Books subject queries"
        );

        let fetches = requests.into_iter().map(|(subject, order_by, start_index)| async move {
            let result = self
                .query_volumes(key, subject, Some(order_by), start_index, RESULTS_PER_PAGE as u32)
                .await;
            (subject, start_index, result)
        });

        let mut diagnostics = Vec::new();
        let mut volumes = Vec::new();
        for (subject, start_index, result) in join_all(fetches).await {
            match result {
                Ok(batch) => volumes.extend(batch),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(subject, start_index, error = %e, "Google Books query failed");
                    diagnostics.push(FetchDiagnostic::new(
                        format!("google-books {} @{}", subject, start_index),
                        &e,
                    ));
                }
            }
        }

        let fetched = volumes.len();
        let items: Vec<ContentItem> = volumes
            .into_iter()
            .filter(|volume| is_eligible(volume, window))
            .filter_map(normalize_volume)
            .collect();
        let mut items = dedupe_by_id(items);
        items.sort_by(|a, b| self.compare(a, b));

        info!(
            fetched,
            eligible = items.len(),
            failed_fetches = diagnostics.len(),
            "Google Books aggregation complete"
        );

        Ok(FetchOutcome { items, diagnostics })
    }

    async fn fetch_item(&self, id: &str) -> Result<Option<ContentItem>, AdapterError> {
        let key = self.key()?;

        // Volume ids are URL-safe base64-ish tokens
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Ok(None);
        }

        let url = format!("{}/volumes/{}", self.base_url, id);
        let volume: Option<Volume> =
            send_json_optional(self.http_client.get(&url).query(&[("key", key)]))
                .await
                .map_err(key_rejection)?;
        Ok(volume.and_then(normalize_volume))
    }

    /// Rating first, then number of ratings
    fn compare(&self, a: &ContentItem, b: &ContentItem) -> Ordering {
        by_rating_desc(a, b).then_with(|| b.vote_count.unwrap_or(0).cmp(&a.vote_count.unwrap_or(0)))
    }
}

/// Google answers a bad key with 400 rather than 401/403
fn key_rejection(err: AdapterError) -> AdapterError {
    match err {
        AdapterError::Api(400, body)
            if body.contains("API_KEY_INVALID") || body.contains("keyInvalid") =>
        {
            AdapterError::Auth(format!("Google Books rejected the API key: {}", body))
        }
        other => other,
    }
}

/// Leaderboard validity filter
///
/// A volume is eligible only if it has a published date inside the window,
/// a cover thumbnail, a description, and a non-zero average rating.
pub fn is_eligible(volume: &Volume, window: &TimeWindow) -> bool {
    let info = &volume.volume_info;

    let dated = info
        .published_date
        .as_deref()
        .is_some_and(|d| window.contains_release(d));
    let has_thumbnail = info
        .image_links
        .as_ref()
        .and_then(|links| links.thumbnail.as_deref())
        .is_some_and(|t| !t.is_empty());
    let has_description = info
        .description
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty());
    let rated = info.average_rating.is_some_and(|r| r > 0.0);

    dated && has_thumbnail && has_description && rated
}

/// Map a volume onto the common model (requires title and published date)
fn normalize_volume(volume: Volume) -> Option<ContentItem> {
    let info = volume.volume_info;
    let title = info.title.filter(|t| !t.trim().is_empty())?;
    let published = info.published_date.filter(|d| !d.is_empty())?;

    let mut item = ContentItem::new(volume.id, title, info.average_rating.unwrap_or(0.0), published);
    item.image_url = info
        .image_links
        .and_then(|links| links.thumbnail)
        .filter(|t| !t.is_empty())
        .map(|t| secure_url(&t))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string());
    item.genres = info.categories;
    item.description = info.description.unwrap_or_default();
    item.vote_count = info.ratings_count;
    Some(item)
}

/// Google serves thumbnails over plain http
fn secure_url(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

impl From<Volume> for Book {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;
        Book {
            id: volume.id,
            title: info.title.unwrap_or_default(),
            authors: info.authors,
            description: info.description,
            published_date: info.published_date,
            page_count: info.page_count,
            categories: info.categories,
            average_rating: info.average_rating,
            ratings_count: info.ratings_count,
            image_links: info.image_links.unwrap_or_default(),
            language: info.language,
            preview_link: info.preview_link,
        }
    }
}

// ============================================================================
// Google Books API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    items: Vec<Volume>,
}

/// Raw Google Books volume
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u64>,
    pub image_links: Option<ImageLinks>,
    pub language: Option<String>,
    pub preview_link: Option<String>,
}
