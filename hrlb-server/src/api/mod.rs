//! HTTP API handlers for hrlb-server

pub mod books;
pub mod content;
pub mod health;
pub mod interactions;
pub mod leaderboard;
pub mod music;

pub use books::search_books;
pub use content::get_content;
pub use health::health_routes;
pub use interactions::{get_interaction, list_interactions, post_interaction};
pub use leaderboard::get_leaderboard;
pub use music::get_music;

/// Positive integer parameter, or `default` when absent or malformed
pub(crate) fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}
