//! Leaderboard endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use hrlb_common::{Category, ContentItem, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::FetchDiagnostic;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::apply_user_ratings;
use crate::AppState;

/// Items returned when `count` is omitted
pub const DEFAULT_COUNT: usize = 10;

/// Query parameters for the leaderboard
///
/// Everything is taken as text so malformed values produce the service's own
/// 400 body instead of the extractor's rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub category: Option<String>,
    pub time_range: Option<String>,
    pub count: Option<String>,
    /// Free-text filter
    pub q: Option<String>,
    /// Overlay this user's ratings onto the items
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub items: Vec<ContentItem>,
    pub total_count: usize,
    pub category: Category,
    pub time_range: TimeRange,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<FetchDiagnostic>,
}

/// Parse a category tag, defaulting to movies
pub fn parse_category(raw: Option<&str>) -> ApiResult<Category> {
    match raw {
        None => Ok(Category::Movie),
        Some(tag) => tag
            .parse()
            .map_err(|_| ApiError::InvalidCategory(tag.to_string())),
    }
}

fn parse_time_range(raw: Option<&str>) -> ApiResult<TimeRange> {
    match raw {
        None => Ok(TimeRange::default()),
        Some(tag) => Ok(tag.parse()?),
    }
}

fn parse_count(raw: Option<&str>) -> ApiResult<usize> {
    match raw {
        None => Ok(DEFAULT_COUNT),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(ApiError::BadRequest(format!(
                "Invalid count: {} (expected a positive integer)",
                value
            ))),
        },
    }
}

/// GET /leaderboard?category=&timeRange=&count=[&q=][&userId=]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let category = parse_category(query.category.as_deref())?;
    let time_range = parse_time_range(query.time_range.as_deref())?;
    let count = parse_count(query.count.as_deref())?;

    debug!(category = %category, time_range = %time_range, count, "Leaderboard request");

    let mut page = match query.q.as_deref() {
        Some(q) => {
            state
                .leaderboard
                .search_leaderboard(category, time_range, count, q)
                .await?
        }
        None => {
            state
                .leaderboard
                .get_leaderboard(category, time_range, count)
                .await?
        }
    };

    if let Some(user_id) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        // Overlay is best effort: the leaderboard is still valid without it
        match state.interactions.get(user_id).await {
            Ok(interactions) => apply_user_ratings(&mut page.items, &interactions),
            Err(e) => warn!(user_id, error = %e, "Could not load user ratings"),
        }
    }

    Ok(Json(LeaderboardResponse {
        items: page.items,
        total_count: page.total_count,
        category: page.category,
        time_range: page.time_range,
        diagnostics: page.diagnostics,
    }))
}
