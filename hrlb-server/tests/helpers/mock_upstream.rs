//! Mock upstream providers
//!
//! Each mock is a real axum server bound to an ephemeral local port, so the
//! adapters exercise their full HTTP path (auth headers, query strings,
//! status mapping, JSON decoding).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TMDB_TOKEN: &str = "tmdb-test-token";
pub const BOOKS_KEY: &str = "books-test-key";
pub const SPOTIFY_TOKEN: &str = "spotify-test-token";

/// Serve `router` on 127.0.0.1 and return its base URL
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("mock upstream address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock upstream crashed");
    });
    format!("http://{}", addr)
}

/// Today (UTC) as `YYYY-MM-DD`
pub fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

fn bearer_matches(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", token))
}

// =============================================================================
// TMDB
// =============================================================================

/// TMDB mock: page 1 carries every listing, later pages are empty
pub struct MockTmdb {
    pub listings: Vec<Value>,
    /// Every discover request answers 503
    pub fail_discover: bool,
    pub discover_calls: AtomicUsize,
}

impl MockTmdb {
    pub fn new(listings: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            listings,
            fail_discover: false,
            discover_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            listings: Vec::new(),
            fail_discover: true,
            discover_calls: AtomicUsize::new(0),
        })
    }

    /// Routes rooted at `/3`, matching the real API layout
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/3/discover/:kind", get(tmdb_discover))
            .route("/3/genre/:kind/list", get(tmdb_genres))
            .route("/3/movie/:id", get(tmdb_movie_detail))
            .with_state(self)
    }
}

/// Discover entry released today
pub fn movie_listing(id: u64, title: &str, vote_average: f64) -> Value {
    json!({
        "id": id,
        "title": title,
        "poster_path": format!("/poster{}.jpg", id),
        "vote_average": vote_average,
        "vote_count": 2500,
        "release_date": today(),
        "genre_ids": [18],
        "overview": format!("Overview of {}", title)
    })
}

async fn tmdb_discover(
    State(mock): State<Arc<MockTmdb>>,
    Path(_kind): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.discover_calls.fetch_add(1, Ordering::SeqCst);

    if !bearer_matches(&headers, TMDB_TOKEN) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status_message": "Invalid API key"})))
            .into_response();
    }
    if mock.fail_discover {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response();
    }
    if params.get("vote_count.gte").map(String::as_str) != Some("1000") {
        return (StatusCode::BAD_REQUEST, "missing vote floor").into_response();
    }

    let results = match params.get("page").map(String::as_str) {
        Some("1") => mock.listings.clone(),
        _ => Vec::new(),
    };
    Json(json!({ "page": 1, "results": results })).into_response()
}

async fn tmdb_genres(headers: HeaderMap) -> Response {
    if !bearer_matches(&headers, TMDB_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "genres": [{"id": 18, "name": "Drama"}, {"id": 80, "name": "Crime"}] }))
        .into_response()
}

async fn tmdb_movie_detail(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !bearer_matches(&headers, TMDB_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id != "550" {
        return (StatusCode::NOT_FOUND, Json(json!({"status_code": 34}))).into_response();
    }
    Json(json!({
        "id": 550,
        "title": "Fight Club",
        "poster_path": "/fc.jpg",
        "vote_average": 8.4,
        "vote_count": 27000,
        "release_date": "1999-10-15",
        "runtime": 139,
        "genres": [{"id": 18, "name": "Drama"}],
        "overview": "A ticking-time-bomb insomniac..."
    }))
    .into_response()
}

// =============================================================================
// Google Books
// =============================================================================

/// Google Books mock: 20 volumes per subject query, 5 eligible in total
pub struct MockBooks {
    pub volume_calls: AtomicUsize,
}

impl MockBooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            volume_calls: AtomicUsize::new(0),
        })
    }

    /// Routes rooted at `/books/v1`
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/books/v1/volumes", get(books_volumes))
            .route("/books/v1/volumes/:id", get(books_volume))
            .with_state(self)
    }
}

/// (subject, index, averageRating, ratingsCount) of the eligible volumes
const ELIGIBLE: [(&str, usize, f64, u64); 5] = [
    ("fiction", 0, 4.5, 10),
    ("fiction", 5, 4.5, 200),
    ("literature", 3, 4.0, 50),
    ("mystery", 10, 3.5, 5),
    ("mystery", 19, 5.0, 1),
];

fn subject_volume(subject: &str, index: usize) -> Value {
    let id = format!("{}-{}", subject, index);
    match ELIGIBLE.iter().find(|(s, i, _, _)| *s == subject && *i == index) {
        Some((_, _, rating, count)) => json!({
            "id": id,
            "volumeInfo": {
                "title": format!("Eligible {}", id),
                "authors": ["Author"],
                "publishedDate": "2001-04-01",
                "description": "Worth reading.",
                "averageRating": rating,
                "ratingsCount": count,
                "imageLinks": {"thumbnail": format!("http://books.example/{}.jpg", id)}
            }
        }),
        // Rotate through the ways a volume can fail the filter
        None => match index % 3 {
            0 => json!({
                "id": id,
                "volumeInfo": {"title": "No cover", "publishedDate": "2001", "description": "x", "averageRating": 4.0}
            }),
            1 => json!({
                "id": id,
                "volumeInfo": {
                    "title": "Unrated", "publishedDate": "2001", "description": "x",
                    "imageLinks": {"thumbnail": "http://books.example/u.jpg"}
                }
            }),
            _ => json!({
                "id": id,
                "volumeInfo": {
                    "title": "No blurb", "publishedDate": "2001", "averageRating": 3.0,
                    "imageLinks": {"thumbnail": "http://books.example/n.jpg"}
                }
            }),
        },
    }
}

async fn books_volumes(
    State(mock): State<Arc<MockBooks>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.volume_calls.fetch_add(1, Ordering::SeqCst);

    if params.get("key").map(String::as_str) != Some(BOOKS_KEY) {
        // Google's actual shape for a rejected key
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT",
                    "details": [{
                        "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                        "reason": "API_KEY_INVALID",
                        "domain": "googleapis.com"
                    }]
                }
            })),
        )
            .into_response();
    }

    let q = params.get("q").cloned().unwrap_or_default();
    let items: Vec<Value> = match q.strip_prefix("subject:") {
        Some(subject @ ("fiction" | "literature" | "mystery")) => {
            (0..20).map(|i| subject_volume(subject, i)).collect()
        }
        Some(_) => Vec::new(),
        None => match q.as_str() {
            "dune" => vec![
                json!({"id": "dune-1", "volumeInfo": {"title": "Dune", "authors": ["Frank Herbert"], "pageCount": 412}}),
                json!({"id": "dune-2", "volumeInfo": {"title": "Dune Messiah", "authors": ["Frank Herbert"]}}),
            ],
            _ => Vec::new(),
        },
    };

    Json(json!({ "totalItems": items.len(), "items": items })).into_response()
}

async fn books_volume(Path(id): Path<String>) -> Response {
    if id == "fiction-0" {
        return Json(subject_volume("fiction", 0)).into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}

// =============================================================================
// Spotify
// =============================================================================

/// Spotify mock: four new releases, one of which has no tracks
#[derive(Default)]
pub struct MockSpotify {
    pub token_exchanges: AtomicUsize,
    /// Album whose track listing answers 403
    pub forbidden_album: Option<&'static str>,
    /// New-releases endpoint answers 404
    pub releases_missing: bool,
}

impl MockSpotify {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_forbidden_album(album_id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            forbidden_album: Some(album_id),
            ..Self::default()
        })
    }

    pub fn without_releases() -> Arc<Self> {
        Arc::new(Self {
            releases_missing: true,
            ..Self::default()
        })
    }

    /// Token endpoint at `/api/token`, Web API rooted at `/v1`
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/token", post(spotify_token))
            .route("/v1/browse/new-releases", get(spotify_new_releases))
            .route("/v1/albums/:id/tracks", get(spotify_album_tracks))
            .route("/v1/tracks/:id", get(spotify_track))
            .route("/v1/search", get(spotify_search))
            .with_state(self)
    }
}

async fn spotify_token(State(mock): State<Arc<MockSpotify>>, headers: HeaderMap, body: String) -> Response {
    mock.token_exchanges.fetch_add(1, Ordering::SeqCst);

    let basic = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "));
    if !basic || body != "grant_type=client_credentials" {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_client"}))).into_response();
    }

    // Slow enough that concurrent callers overlap the exchange
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    Json(json!({
        "access_token": SPOTIFY_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn spotify_new_releases(State(mock): State<Arc<MockSpotify>>, headers: HeaderMap) -> Response {
    if !bearer_matches(&headers, SPOTIFY_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if mock.releases_missing {
        return (StatusCode::NOT_FOUND, Json(json!({"error": {"status": 404}}))).into_response();
    }
    Json(json!({
        "albums": {
            "items": [{"id": "a1"}, {"id": "a2"}, {"id": "a3"}, {"id": "a4"}]
        }
    }))
    .into_response()
}

async fn spotify_album_tracks(
    State(mock): State<Arc<MockSpotify>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !bearer_matches(&headers, SPOTIFY_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if mock.forbidden_album == Some(id.as_str()) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"status": 403, "message": "Not available in this market"}})),
        )
            .into_response();
    }
    let items = if id == "a3" {
        json!([])
    } else {
        json!([{ "id": format!("t{}", &id[1..]) }])
    };
    Json(json!({ "items": items })).into_response()
}

fn track_json(id: &str) -> Option<Value> {
    let (name, popularity, release_date) = match id {
        "t1" => ("Fresh Single", 80, today()),
        "t2" => ("Old Favourite", 90, "1999-05-01".to_string()),
        "t4" => ("Decade Hit", 60, "2010".to_string()),
        _ => return None,
    };
    Some(json!({
        "id": id,
        "name": name,
        "popularity": popularity,
        "duration_ms": 185_000,
        "artists": [{"name": "Test Artist"}],
        "album": {
            "name": format!("{} (Album)", name),
            "release_date": release_date,
            "images": [{"url": format!("https://img.example/{}.jpg", id)}]
        },
        "external_urls": {"spotify": format!("https://open.spotify.com/track/{}", id)}
    }))
}

async fn spotify_track(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !bearer_matches(&headers, SPOTIFY_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match track_json(&id) {
        Some(track) => Json(track).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": {"status": 404}}))).into_response(),
    }
}

async fn spotify_search(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if !bearer_matches(&headers, SPOTIFY_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let items: Vec<Value> = match params.get("q").map(String::as_str) {
        Some("decade") => track_json("t4").into_iter().collect(),
        _ => Vec::new(),
    };
    Json(json!({ "tracks": { "items": items } })).into_response()
}
