//! Single-item lookup

use axum::{
    extract::{Path, Query, State},
    Json,
};
use hrlb_common::ContentItem;
use serde::Deserialize;

use super::leaderboard::parse_category;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    pub category: Option<String>,
}

/// GET /content/:id?category=
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Json<ContentItem>> {
    let category = parse_category(query.category.as_deref())?;
    let adapter = state.leaderboard.adapter(category)?;

    adapter
        .fetch_item(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No {} found with id {}", category, id)))
}
