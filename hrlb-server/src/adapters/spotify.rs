//! Spotify adapter (music)
//!
//! Leaderboard candidates are the lead tracks of the latest new releases.
//! Each release is resolved through two dependent calls
//! (album → first track → full track detail); a release that fails or comes
//! back empty at any hop is dropped, not retried. Only the token exchange and
//! the new-releases listing can fail the whole fetch.
//!
//! Popularity (0-100) is mapped linearly onto the 0-5 rating scale.

use super::token::TokenProvider;
use super::{
    by_rating_desc, send_json_optional, AdapterError, ContentAdapter, FetchDiagnostic, FetchOutcome,
};
use async_trait::async_trait;
use futures::future::join_all;
use hrlb_common::content::PLACEHOLDER_IMAGE_URL;
use hrlb_common::{Category, ContentItem, TimeRange, TimeWindow};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Spotify Web API base URL
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Popularity 0-100 divided by this gives a 0-5 rating
pub const SPOTIFY_POPULARITY_DIVISOR: f64 = 20.0;

/// Spotify caps list endpoints at 50 entries
pub const MAX_BATCH: usize = 50;

/// Market used for new releases
const MARKET: &str = "US";

/// Spotify adapter
pub struct SpotifyAdapter {
    http_client: Client,
    base_url: String,
    tokens: TokenProvider,
}

impl SpotifyAdapter {
    pub fn new(http_client: Client, tokens: TokenProvider) -> Self {
        Self {
            http_client,
            base_url: SPOTIFY_API_URL.to_string(),
            tokens,
        }
    }

    /// Point the adapter at a different API root (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Authorized GET; a rejected token is dropped so the next call re-exchanges
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AdapterError> {
        let result = self.get_resource(token, path, query).await;
        if let Err(AdapterError::Auth(_)) = &result {
            self.tokens.invalidate().await;
        }
        result
    }

    /// Authorized GET that leaves the token alone on 401/403
    ///
    /// Used for per-release hops, where a rejection concerns that one
    /// resource (region lock, takedown) rather than the token.
    async fn get_resource<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, AdapterError> {
        let url = format!("{}{}", self.base_url, path);
        send_json_optional(self.http_client.get(&url).bearer_auth(token).query(query)).await
    }

    /// `None` when the endpoint itself is missing
    async fn new_releases(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Option<Vec<AlbumRef>>, AdapterError> {
        let query = [("limit", limit.to_string()), ("country", MARKET.to_string())];
        let body: Option<NewReleases> = self.get_json(token, "/browse/new-releases", &query).await?;
        Ok(body.map(|b| b.albums.items))
    }

    /// Album → first track → full track detail
    async fn resolve_lead_track(
        &self,
        token: &str,
        album_id: &str,
    ) -> Result<Option<SpotifyTrack>, AdapterError> {
        let path = format!("/albums/{}/tracks", album_id);
        let tracks: Option<Paging<TrackRef>> =
            self.get_resource(token, &path, &[("limit", "1".to_string())]).await?;

        let Some(first) = tracks.and_then(|t| t.items.into_iter().next()) else {
            return Ok(None);
        };

        self.get_resource(token, &format!("/tracks/{}", first.id), &[]).await
    }

    /// Lead tracks of the latest releases, unfiltered
    pub async fn top_tracks(&self, limit: usize) -> Result<FetchOutcome, AdapterError> {
        let token = self.tokens.access_token().await?;
        let limit = limit.clamp(1, MAX_BATCH);
        let mut diagnostics = Vec::new();

        let releases = match self.new_releases(&token, limit).await {
            Ok(Some(releases)) => releases,
            Ok(None) => {
                warn!("New releases endpoint returned 404");
                diagnostics.push(FetchDiagnostic {
                    source: "spotify new-releases".to_string(),
                    message: "new releases not found (404)".to_string(),
                });
                return Ok(FetchOutcome {
                    items: Vec::new(),
                    diagnostics,
                });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to fetch new releases");
                diagnostics.push(FetchDiagnostic::new("spotify new-releases", &e));
                return Ok(FetchOutcome {
                    items: Vec::new(),
                    diagnostics,
                });
            }
        };

        debug!(releases = releases.len(), "Resolving lead tracks");

        let token = token.as_str();
        let resolutions = releases.iter().map(|album| async move {
            (album.id.as_str(), self.resolve_lead_track(token, &album.id).await)
        });

        // Any per-release failure, 401/403 included, only drops that release
        let mut items = Vec::new();
        for (album_id, result) in join_all(resolutions).await {
            match result {
                Ok(Some(track)) => items.extend(normalize_track(track)),
                Ok(None) => {
                    debug!(album_id, "Release has no resolvable track, dropping");
                    diagnostics.push(FetchDiagnostic {
                        source: format!("spotify album {}", album_id),
                        message: "no track found".to_string(),
                    });
                }
                Err(e) => {
                    warn!(album_id, error = %e, "Track resolution failed, dropping release");
                    diagnostics.push(FetchDiagnostic::new(format!("spotify album {}", album_id), &e));
                }
            }
        }

        Ok(FetchOutcome { items, diagnostics })
    }

    /// Free-text track search
    pub async fn search_tracks(&self, q: &str, limit: usize) -> Result<Vec<ContentItem>, AdapterError> {
        let token = self.tokens.access_token().await?;
        let query = [
            ("q", q.to_string()),
            ("type", "track".to_string()),
            ("limit", limit.clamp(1, MAX_BATCH).to_string()),
        ];
        let body: Option<SearchResponse> = self.get_json(&token, "/search", &query).await?;
        Ok(body
            .map(|b| b.tracks.items)
            .unwrap_or_default()
            .into_iter()
            .filter_map(normalize_track)
            .collect())
    }

    /// Single track by id
    pub async fn track_by_id(&self, id: &str) -> Result<Option<ContentItem>, AdapterError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }
        let token = self.tokens.access_token().await?;
        let track: Option<SpotifyTrack> = self.get_json(&token, &format!("/tracks/{}", id), &[]).await?;
        Ok(track.and_then(normalize_track))
    }
}

#[async_trait]
impl ContentAdapter for SpotifyAdapter {
    fn name(&self) -> &'static str {
        "Spotify"
    }

    fn category(&self) -> Category {
        Category::Music
    }

    async fn fetch_ranked(
        &self,
        window: &TimeWindow,
        page_budget: usize,
    ) -> Result<FetchOutcome, AdapterError> {
        let mut outcome = self.top_tracks(page_budget).await?;

        // New releases have no server-side date filter
        if window.range != TimeRange::All {
            let before = outcome.items.len();
            outcome
                .items
                .retain(|item| window.contains_release(&item.release_date));
            debug!(before, after = outcome.items.len(), "Applied release-date window");
        }

        outcome.items.sort_by(by_rating_desc);

        info!(
            kept = outcome.items.len(),
            failed_fetches = outcome.diagnostics.len(),
            "Spotify aggregation complete"
        );

        Ok(outcome)
    }

    async fn fetch_item(&self, id: &str) -> Result<Option<ContentItem>, AdapterError> {
        self.track_by_id(id).await
    }
}

/// Map a full track onto the common model
fn normalize_track(track: SpotifyTrack) -> Option<ContentItem> {
    if track.name.trim().is_empty() {
        return None;
    }

    let artists: Vec<String> = track.artists.into_iter().map(|a| a.name).collect();
    let album = track.album.unwrap_or_default();

    let mut item = ContentItem::new(
        track.id,
        track.name,
        track.popularity as f64 / SPOTIFY_POPULARITY_DIVISOR,
        album.release_date.unwrap_or_default(),
    );
    item.image_url = album
        .images
        .into_iter()
        .next()
        .map(|image| image.url)
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string());
    item.duration = Some(format_duration(track.duration_ms));
    item.description = format!("By {} • {}", artists.join(", "), album.name);
    item.genres = artists;
    item.streaming_links = track.external_urls.spotify.map(|url| vec![url]);
    Some(item)
}

/// `m:ss`, rounded to the nearest second
fn format_duration(duration_ms: u64) -> String {
    let total_secs = (duration_ms + 500) / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

// ============================================================================
// Spotify API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct NewReleases {
    albums: Paging<AlbumRef>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    popularity: u32,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}
