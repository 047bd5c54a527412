//! Book search endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::positive_or;
use crate::adapters::books::Book;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Volumes returned when `maxResults` is omitted or not a positive integer
pub const DEFAULT_MAX_RESULTS: usize = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSearchQuery {
    pub q: Option<String>,
    pub max_results: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookSearchResponse {
    pub books: Vec<Book>,
}

/// GET /books?q=&maxResults=
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<BookSearchQuery>,
) -> ApiResult<Json<BookSearchResponse>> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::MissingParameter("Query parameter 'q' is required".to_string()))?;

    let max_results = positive_or(query.max_results.as_deref(), DEFAULT_MAX_RESULTS);
    let max_results = u32::try_from(max_results).unwrap_or(u32::MAX);

    let books = state.books.search_books(q, max_results).await?;
    Ok(Json(BookSearchResponse { books }))
}
