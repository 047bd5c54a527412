//! TMDB adapter (movies and TV)
//!
//! Fetches the highest-rated titles from the TMDB discover endpoint.
//!
//! # API Reference
//! - Discover: `GET /discover/{movie|tv}` (bearer token)
//! - Genres: `GET /genre/{movie|tv}/list`
//! - Details: `GET /movie/{id}`, `GET /tv/{id}`
//!
//! Genre names are resolved once per aggregation call, concurrently with the
//! discover pages, and are never cached across calls.

use super::{
    by_rating_desc, dedupe_by_id, send_json, send_json_optional, AdapterError, ContentAdapter,
    FetchDiagnostic, FetchOutcome,
};
use async_trait::async_trait;
use futures::future::join_all;
use hrlb_common::content::PLACEHOLDER_IMAGE_URL;
use hrlb_common::{Category, ContentItem, TimeWindow};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// TMDB API base URL
const TMDB_API_URL: &str = "https://api.themoviedb.org/3";

/// Poster base URL (500px wide)
const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Minimum votes for a title to be statistically meaningful
pub const MIN_VOTE_COUNT: u32 = 1000;

/// Which TMDB catalogue an adapter serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    fn path(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }

    fn date_param(&self) -> &'static str {
        match self {
            MediaKind::Movie => "primary_release_date",
            MediaKind::Tv => "first_air_date",
        }
    }
}

/// TMDB adapter
pub struct TmdbAdapter {
    http_client: Client,
    base_url: String,
    access_token: Option<String>,
    kind: MediaKind,
}

impl TmdbAdapter {
    pub fn new(http_client: Client, kind: MediaKind, access_token: Option<String>) -> Self {
        Self {
            http_client,
            base_url: TMDB_API_URL.to_string(),
            access_token,
            kind,
        }
    }

    /// Point the adapter at a different API root (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn token(&self) -> Result<&str, AdapterError> {
        self.access_token
            .as_deref()
            .ok_or_else(|| AdapterError::Auth("TMDB access token not configured".to_string()))
    }

    fn source(&self) -> String {
        format!("tmdb/{}", self.kind.path())
    }

    /// Fetch one discover page
    async fn fetch_page(
        &self,
        token: &str,
        window: &TimeWindow,
        page: usize,
    ) -> Result<Vec<TmdbListing>, AdapterError> {
        let url = format!("{}/discover/{}", self.base_url, self.kind.path());
        let date_param = self.kind.date_param();
        let query = [
            ("language".to_string(), "en-US".to_string()),
            ("sort_by".to_string(), "vote_average.desc".to_string()),
            ("page".to_string(), page.to_string()),
            ("vote_count.gte".to_string(), MIN_VOTE_COUNT.to_string()),
            (format!("{}.gte", date_param), window.start_param()),
            (format!("{}.lte", date_param), window.end_param()),
        ];

        debug!(kind = self.kind.path(), page, "Querying TMDB discover");

        let body: DiscoverPage =
            send_json(self.http_client.get(&url).bearer_auth(token).query(&query)).await?;
        Ok(body.results)
    }

    /// Genre id → name lookup for this catalogue
    async fn fetch_genres(&self, token: &str) -> Result<HashMap<u32, String>, AdapterError> {
        let url = format!("{}/genre/{}/list", self.base_url, self.kind.path());
        let body: GenreList = send_json(self.http_client.get(&url).bearer_auth(token)).await?;
        Ok(body.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }
}

#[async_trait]
impl ContentAdapter for TmdbAdapter {
    fn name(&self) -> &'static str {
        match self.kind {
            MediaKind::Movie => "TMDB movies",
            MediaKind::Tv => "TMDB TV",
        }
    }

    fn category(&self) -> Category {
        match self.kind {
            MediaKind::Movie => Category::Movie,
            MediaKind::Tv => Category::Tv,
        }
    }

    async fn fetch_ranked(
        &self,
        window: &TimeWindow,
        page_budget: usize,
    ) -> Result<FetchOutcome, AdapterError> {
        let token = self.token()?;

        info!(
            kind = self.kind.path(),
            start = %window.start,
            end = %window.end,
            pages = page_budget,
            "Fetching TMDB discover pages"
        );

        let pages = (1..=page_budget).map(|page| async move {
            (page, self.fetch_page(token, window, page).await)
        });
        let (pages, genres) = tokio::join!(join_all(pages), self.fetch_genres(token));

        let mut diagnostics = Vec::new();

        let genres = match genres {
            Ok(genres) => genres,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(kind = self.kind.path(), error = %e, "Genre lookup failed, genres left unresolved");
                diagnostics.push(FetchDiagnostic::new(format!("{} genres", self.source()), &e));
                HashMap::new()
            }
        };

        let mut listings = Vec::new();
        for (page, result) in pages {
            match result {
                Ok(results) => listings.extend(results),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(kind = self.kind.path(), page, error = %e, "TMDB page fetch failed");
                    diagnostics.push(FetchDiagnostic::new(
                        format!("{} page {}", self.source(), page),
                        &e,
                    ));
                }
            }
        }

        let fetched = listings.len();
        let items: Vec<ContentItem> = listings
            .into_iter()
            .filter_map(|listing| normalize_listing(self.kind, listing, &genres))
            .filter(|item| window.contains_release(&item.release_date))
            .collect();
        let mut items = dedupe_by_id(items);
        items.sort_by(by_rating_desc);

        info!(
            kind = self.kind.path(),
            fetched,
            kept = items.len(),
            failed_fetches = diagnostics.len(),
            "TMDB aggregation complete"
        );

        Ok(FetchOutcome { items, diagnostics })
    }

    async fn fetch_item(&self, id: &str) -> Result<Option<ContentItem>, AdapterError> {
        let token = self.token()?;

        // TMDB ids are numeric; anything else cannot exist
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(None);
        }

        let url = format!("{}/{}/{}", self.base_url, self.kind.path(), id);
        let detail: Option<TmdbDetail> = send_json_optional(
            self.http_client
                .get(&url)
                .bearer_auth(token)
                .query(&[("language", "en-US")]),
        )
        .await?;

        Ok(detail.and_then(|d| normalize_detail(self.kind, d)))
    }
}

/// Map a discover entry onto the common model
///
/// Entries without a title or a release date are dropped.
fn normalize_listing(
    kind: MediaKind,
    listing: TmdbListing,
    genres: &HashMap<u32, String>,
) -> Option<ContentItem> {
    let title = match kind {
        MediaKind::Movie => listing.title,
        MediaKind::Tv => listing.name,
    }
    .filter(|t| !t.trim().is_empty())?;

    let release_date = match kind {
        MediaKind::Movie => listing.release_date,
        MediaKind::Tv => listing.first_air_date,
    }
    .filter(|d| !d.is_empty())?;

    let mut item = ContentItem::new(listing.id.to_string(), title, listing.vote_average, release_date);
    item.image_url = poster_url(listing.poster_path.as_deref());
    item.genres = listing
        .genre_ids
        .iter()
        .filter_map(|id| genres.get(id).cloned())
        .collect();
    item.description = listing.overview.unwrap_or_default();
    item.vote_count = Some(listing.vote_count);
    Some(item)
}

fn normalize_detail(kind: MediaKind, detail: TmdbDetail) -> Option<ContentItem> {
    let title = match kind {
        MediaKind::Movie => detail.title,
        MediaKind::Tv => detail.name,
    }
    .filter(|t| !t.trim().is_empty())?;

    let release_date = match kind {
        MediaKind::Movie => detail.release_date,
        MediaKind::Tv => detail.first_air_date,
    }
    .unwrap_or_default();

    let minutes = match kind {
        MediaKind::Movie => detail.runtime.filter(|m| *m > 0),
        MediaKind::Tv => detail.episode_run_time.first().copied(),
    };

    let mut item = ContentItem::new(detail.id.to_string(), title, detail.vote_average, release_date);
    item.image_url = poster_url(detail.poster_path.as_deref());
    item.genres = detail.genres.into_iter().map(|g| g.name).collect();
    item.description = detail.overview.unwrap_or_default();
    item.vote_count = Some(detail.vote_count);
    item.duration = minutes.map(|m| format!("{} min", m));
    Some(item)
}

fn poster_url(poster_path: Option<&str>) -> String {
    match poster_path {
        Some(path) if !path.is_empty() => format!("{}{}", TMDB_IMAGE_URL, path),
        _ => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

// ============================================================================
// TMDB API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Vec<TmdbListing>,
}

#[derive(Debug, Deserialize)]
struct TmdbListing {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
    overview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    overview: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
}
