//! Aggregation pipeline
//!
//! Dispatches a leaderboard request to the single adapter registered for the
//! requested category, ranks what comes back and truncates to the requested
//! count. Categories are never merged.

use crate::adapters::{AdapterError, ContentAdapter, FetchDiagnostic};
use hrlb_common::config::PipelineBudgets;
use hrlb_common::content::release_year;
use hrlb_common::{Category, ContentItem, TimeRange, TimeWindow, UserInteraction};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Candidate floor used when a search query narrows the leaderboard
pub const MIN_CANDIDATES: usize = 100;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Aggregation produced zero items
    #[error("No content found for the specified criteria")]
    NoContent { diagnostics: Vec<FetchDiagnostic> },

    #[error("Upstream failure: {0}")]
    Upstream(#[from] AdapterError),

    #[error("No adapter registered for category {0}")]
    AdapterMissing(Category),
}

/// One page of ranked results
#[derive(Debug, Clone)]
pub struct LeaderboardPage {
    pub items: Vec<ContentItem>,
    /// Ranked candidates before truncation (after search filtering)
    pub total_count: usize,
    pub category: Category,
    pub time_range: TimeRange,
    pub diagnostics: Vec<FetchDiagnostic>,
}

/// Category → adapter registry plus per-category fetch budgets
pub struct Leaderboard {
    adapters: HashMap<Category, Arc<dyn ContentAdapter>>,
    budgets: PipelineBudgets,
}

impl Leaderboard {
    pub fn new(budgets: PipelineBudgets) -> Self {
        Self {
            adapters: HashMap::new(),
            budgets,
        }
    }

    /// Register the adapter for its category (replacing any previous one)
    pub fn with_adapter(mut self, adapter: Arc<dyn ContentAdapter>) -> Self {
        self.adapters.insert(adapter.category(), adapter);
        self
    }

    pub fn adapter(&self, category: Category) -> Result<&Arc<dyn ContentAdapter>, LeaderboardError> {
        self.adapters
            .get(&category)
            .ok_or(LeaderboardError::AdapterMissing(category))
    }

    /// Top `count` items of `category` released inside `time_range`
    pub async fn get_leaderboard(
        &self,
        category: Category,
        time_range: TimeRange,
        count: usize,
    ) -> Result<LeaderboardPage, LeaderboardError> {
        self.run(category, TimeWindow::current(time_range), count, None)
            .await
    }

    /// Leaderboard narrowed by a free-text query
    ///
    /// Filtering runs over at least [`MIN_CANDIDATES`] ranked candidates
    /// before truncation; surviving items keep their leaderboard rank.
    pub async fn search_leaderboard(
        &self,
        category: Category,
        time_range: TimeRange,
        count: usize,
        query: &str,
    ) -> Result<LeaderboardPage, LeaderboardError> {
        self.run(category, TimeWindow::current(time_range), count, Some(query))
            .await
    }

    /// Shared implementation, with the window fixed by the caller
    pub async fn run(
        &self,
        category: Category,
        window: TimeWindow,
        count: usize,
        query: Option<&str>,
    ) -> Result<LeaderboardPage, LeaderboardError> {
        let adapter = self.adapter(category)?;
        let budget = self.budgets.for_category(category);

        debug!(
            category = %category,
            time_range = %window.range,
            start = %window.start,
            end = %window.end,
            budget,
            "Fetching leaderboard candidates"
        );

        let outcome = adapter.fetch_ranked(&window, budget).await.map_err(|e| {
            warn!(adapter = adapter.name(), error = %e, "Aggregation aborted");
            e
        })?;

        let mut items = outcome.items;
        let diagnostics = outcome.diagnostics;

        if items.is_empty() {
            info!(
                category = %category,
                failed_fetches = diagnostics.len(),
                "No content found"
            );
            return Err(LeaderboardError::NoContent { diagnostics });
        }

        // Stable: equal items keep adapter order
        items.sort_by(|a, b| adapter.compare(a, b));
        for (position, item) in items.iter_mut().enumerate() {
            item.rank = Some(position as u32 + 1);
        }

        let (items, total_count) = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                items.truncate(count.max(MIN_CANDIDATES));
                let mut matched = filter_by_search(items, q);
                let total = matched.len();
                matched.truncate(count);
                (matched, total)
            }
            None => {
                let total = items.len();
                items.truncate(count);
                (items, total)
            }
        };

        info!(
            category = %category,
            time_range = %window.range,
            total_count,
            returned = items.len(),
            failed_fetches = diagnostics.len(),
            "Leaderboard built"
        );

        Ok(LeaderboardPage {
            items,
            total_count,
            category,
            time_range: window.range,
            diagnostics,
        })
    }
}

/// True when every whitespace-separated term appears in some searchable field
pub fn matches_search(item: &ContentItem, query: &str) -> bool {
    let haystack = [
        item.title.to_lowercase(),
        item.description.to_lowercase(),
        item.genres.join(" ").to_lowercase(),
        item.rating.to_string(),
        release_year(&item.release_date).unwrap_or_default(),
        item.rating_classification
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
    ];

    query
        .split_whitespace()
        .map(str::to_lowercase)
        .all(|term| haystack.iter().any(|field| field.contains(&term)))
}

pub fn filter_by_search(items: Vec<ContentItem>, query: &str) -> Vec<ContentItem> {
    items
        .into_iter()
        .filter(|item| matches_search(item, query))
        .collect()
}

/// Fill `userRating` from the user's rated interactions
pub fn apply_user_ratings(items: &mut [ContentItem], interactions: &[UserInteraction]) {
    let ratings: HashMap<&str, f64> = interactions
        .iter()
        .filter(|i| i.rating > 0.0)
        .map(|i| (i.content_id.as_str(), i.rating))
        .collect();

    for item in items {
        if let Some(rating) = ratings.get(item.id.as_str()) {
            item.user_rating = Some(*rating);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockAdapter;
    use std::sync::atomic::Ordering;

    fn item(id: &str, rating: f64) -> ContentItem {
        ContentItem::new(id, format!("Title {}", id), rating, "2024-01-01")
    }

    fn board(adapter: MockAdapter) -> (Leaderboard, Arc<MockAdapter>) {
        let adapter = Arc::new(adapter);
        let board = Leaderboard::new(PipelineBudgets::default()).with_adapter(adapter.clone());
        (board, adapter)
    }

    #[tokio::test]
    async fn test_ranks_are_dense_and_sorted() {
        let (board, _) = board(MockAdapter::new(
            Category::Movie,
            vec![item("a", 6.0), item("b", 9.0), item("c", 7.5)],
        ));

        let page = board
            .get_leaderboard(Category::Movie, TimeRange::Week, 10)
            .await
            .unwrap();

        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        let ranks: Vec<_> = page.items.iter().map(|i| i.rank.unwrap()).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(page.total_count, 3);
    }

    #[tokio::test]
    async fn test_ties_keep_adapter_order() {
        let (board, _) = board(MockAdapter::new(
            Category::Tv,
            vec![item("first", 8.0), item("second", 8.0), item("third", 8.0)],
        ));

        let page = board
            .get_leaderboard(Category::Tv, TimeRange::Month, 10)
            .await
            .unwrap();

        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_truncates_to_count_but_reports_total() {
        let items = (0..25).map(|n| item(&n.to_string(), n as f64 / 3.0)).collect();
        let (board, _) = board(MockAdapter::new(Category::Movie, items));

        let page = board
            .get_leaderboard(Category::Movie, TimeRange::Year, 10)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.items.last().unwrap().rank, Some(10));
    }

    #[tokio::test]
    async fn test_empty_result_is_no_content_with_diagnostics() {
        let mut adapter = MockAdapter::new(Category::Movie, Vec::new());
        adapter.diagnostics = vec![FetchDiagnostic {
            source: "tmdb/movie page 1".to_string(),
            message: "Network error: timed out".to_string(),
        }];
        let (board, _) = board(adapter);

        match board.get_leaderboard(Category::Movie, TimeRange::Week, 10).await {
            Err(LeaderboardError::NoContent { diagnostics }) => assert_eq!(diagnostics.len(), 1),
            other => panic!("expected NoContent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let (board, _) = board(MockAdapter::failing_auth(Category::Music));
        let result = board.get_leaderboard(Category::Music, TimeRange::All, 10).await;
        assert!(matches!(
            result,
            Err(LeaderboardError::Upstream(AdapterError::Auth(_)))
        ));
    }

    #[tokio::test]
    async fn test_missing_adapter() {
        let (board, _) = board(MockAdapter::new(Category::Movie, vec![item("a", 1.0)]));
        let result = board.get_leaderboard(Category::Book, TimeRange::All, 10).await;
        assert!(matches!(
            result,
            Err(LeaderboardError::AdapterMissing(Category::Book))
        ));
    }

    #[tokio::test]
    async fn test_category_budget_passed_to_adapter() {
        let budgets = PipelineBudgets {
            book_pages: 3,
            ..PipelineBudgets::default()
        };
        let adapter = Arc::new(MockAdapter::new(Category::Book, vec![item("a", 4.0)]));
        let board = Leaderboard::new(budgets).with_adapter(adapter.clone());

        board
            .get_leaderboard(Category::Book, TimeRange::All, 10)
            .await
            .unwrap();

        assert_eq!(adapter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.last_budget.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_filters_before_truncation_and_keeps_rank() {
        let mut items: Vec<_> = (0..30).map(|n| item(&format!("x{}", n), 9.0 - n as f64 / 10.0)).collect();
        items[20].title = "The Matrix".to_string();
        items[25].genres = vec!["Matrix Sequel".to_string()];
        let (board, _) = board(MockAdapter::new(Category::Movie, items));

        let page = board
            .search_leaderboard(Category::Movie, TimeRange::All, 1, "matrix")
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "The Matrix");
        assert_eq!(page.items[0].rank, Some(21));
    }

    #[tokio::test]
    async fn test_blank_search_behaves_like_plain_leaderboard() {
        let (board, _) = board(MockAdapter::new(
            Category::Movie,
            vec![item("a", 6.0), item("b", 9.0)],
        ));

        let page = board
            .search_leaderboard(Category::Movie, TimeRange::All, 10, "   ")
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);
    }

    #[test]
    fn test_matches_search_requires_every_term() {
        let mut movie = ContentItem::new("1", "Dune: Part Two", 8.3, "2024-02-27");
        movie.description = "Paul Atreides unites with Chani".to_string();
        movie.genres = vec!["Science Fiction".to_string(), "Adventure".to_string()];
        movie.rating_classification = Some("PG-13".to_string());

        assert!(matches_search(&movie, "dune"));
        assert!(matches_search(&movie, "DUNE science"));
        assert!(matches_search(&movie, "2024 pg-13"));
        assert!(matches_search(&movie, "8.3"));
        assert!(matches_search(&movie, "chani adventure"));
        assert!(!matches_search(&movie, "dune romance"));
    }

    #[test]
    fn test_apply_user_ratings_skips_unrated() {
        let mut items = vec![item("a", 7.0), item("b", 8.0)];
        let mut rated = UserInteraction::new("u1", "a");
        rated.rating = 9.0;
        let unrated = UserInteraction::new("u1", "b");

        apply_user_ratings(&mut items, &[rated, unrated]);

        assert_eq!(items[0].user_rating, Some(9.0));
        assert_eq!(items[1].user_rating, None);
    }
}
