//! Test helpers for hrlb-server integration tests
//!
//! - Mock upstream providers (TMDB, Google Books, Spotify) on local ports
//! - App construction wired to those mocks

#![allow(dead_code)]

pub mod mock_upstream;

pub use mock_upstream::{
    movie_listing, spawn_upstream, today, MockBooks, MockSpotify, MockTmdb, BOOKS_KEY,
    TMDB_TOKEN,
};

use axum::body::Body;
use axum::http::Request;
use hrlb_common::config::PipelineBudgets;
use hrlb_server::adapters::books::BooksAdapter;
use hrlb_server::adapters::spotify::SpotifyAdapter;
use hrlb_server::adapters::tmdb::{MediaKind, TmdbAdapter};
use hrlb_server::adapters::token::TokenProvider;
use hrlb_server::adapters::{http_client, ContentAdapter};
use hrlb_server::interactions::MemoryInteractionStore;
use hrlb_server::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Base URLs of the running mocks
pub struct Upstreams {
    pub tmdb: String,
    pub books: String,
    pub spotify: String,
}

impl Upstreams {
    pub async fn start(tmdb: Arc<MockTmdb>, books: Arc<MockBooks>, spotify: Arc<MockSpotify>) -> Self {
        Self {
            tmdb: spawn_upstream(tmdb.router()).await,
            books: spawn_upstream(books.router()).await,
            spotify: spawn_upstream(spotify.router()).await,
        }
    }
}

pub fn client() -> reqwest::Client {
    http_client(Duration::from_secs(5)).expect("http client")
}

pub fn tmdb_adapter(base: &str, kind: MediaKind) -> TmdbAdapter {
    TmdbAdapter::new(client(), kind, Some(TMDB_TOKEN.to_string())).with_base_url(format!("{}/3", base))
}

pub fn books_adapter(base: &str, key: Option<&str>) -> BooksAdapter {
    BooksAdapter::new(client(), key.map(str::to_string)).with_base_url(format!("{}/books/v1", base))
}

pub fn spotify_adapter(base: &str) -> SpotifyAdapter {
    let tokens = TokenProvider::new(
        client(),
        Some("client-id".to_string()),
        Some("client-secret".to_string()),
    )
    .with_token_url(format!("{}/api/token", base));
    SpotifyAdapter::new(client(), tokens).with_base_url(format!("{}/v1", base))
}

/// Full application state pointed at the mocks
pub fn app_state(upstreams: &Upstreams) -> AppState {
    let media: Vec<Arc<dyn ContentAdapter>> = vec![
        Arc::new(tmdb_adapter(&upstreams.tmdb, MediaKind::Movie)),
        Arc::new(tmdb_adapter(&upstreams.tmdb, MediaKind::Tv)),
    ];
    AppState::new(
        PipelineBudgets::default(),
        media,
        Arc::new(books_adapter(&upstreams.books, Some(BOOKS_KEY))),
        Arc::new(spotify_adapter(&upstreams.spotify)),
        Arc::new(MemoryInteractionStore::new()),
    )
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
