//! hrlb-server library - HighRatings leaderboard service
//!
//! Aggregates top-rated movies, TV shows, books and music from third-party
//! providers into ranked leaderboards, and records per-user interactions.

use axum::Router;
use hrlb_common::config::PipelineBudgets;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod adapters;
pub mod api;
pub mod error;
pub mod interactions;
pub mod pipeline;

use adapters::books::BooksAdapter;
use adapters::spotify::SpotifyAdapter;
use interactions::InteractionStore;
use pipeline::Leaderboard;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Category → adapter registry and ranking
    pub leaderboard: Arc<Leaderboard>,
    /// Book search (also registered in the leaderboard)
    pub books: Arc<BooksAdapter>,
    /// Track search and lookup (also registered in the leaderboard)
    pub music: Arc<SpotifyAdapter>,
    pub interactions: Arc<dyn InteractionStore>,
}

impl AppState {
    /// Wire the adapters into a leaderboard
    ///
    /// `books` and `music` are shared between their dedicated endpoints and
    /// the leaderboard registry; `media` adapters (movie, TV) only serve the
    /// leaderboard and `/content`.
    pub fn new(
        budgets: PipelineBudgets,
        media: Vec<Arc<dyn adapters::ContentAdapter>>,
        books: Arc<BooksAdapter>,
        music: Arc<SpotifyAdapter>,
        interactions: Arc<dyn InteractionStore>,
    ) -> Self {
        let leaderboard = media
            .into_iter()
            .fold(Leaderboard::new(budgets), |board, adapter| {
                board.with_adapter(adapter)
            })
            .with_adapter(books.clone())
            .with_adapter(music.clone());

        Self {
            leaderboard: Arc::new(leaderboard),
            books,
            music,
            interactions,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/leaderboard", get(api::get_leaderboard))
        .route("/books", get(api::search_books))
        .route("/music", get(api::get_music))
        .route("/content/:id", get(api::get_content))
        .route("/users/:user_id/interactions", get(api::list_interactions))
        .route(
            "/users/:user_id/interactions/:content_id",
            get(api::get_interaction).post(api::post_interaction),
        )
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
