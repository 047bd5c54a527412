//! Music lookup endpoint
//!
//! One route, three modes chosen by parameter precedence:
//! `trackId` (single track), then `top=true` (latest releases), then `q`
//! (search).

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::positive_or;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Tracks returned when `limit` is omitted or not a positive integer
pub const DEFAULT_LIMIT: usize = 10;

/// Taken as text; malformed values fall back instead of failing extraction
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicQuery {
    pub q: Option<String>,
    pub track_id: Option<String>,
    /// Only the literal `true` selects top tracks
    pub top: Option<String>,
    pub limit: Option<String>,
}

/// GET /music?trackId= | top=true | q= [&limit=]
pub async fn get_music(
    State(state): State<AppState>,
    Query(query): Query<MusicQuery>,
) -> ApiResult<Response> {
    let limit = positive_or(query.limit.as_deref(), DEFAULT_LIMIT);

    if let Some(track_id) = query.track_id.as_deref().filter(|id| !id.is_empty()) {
        debug!(track_id, "Track lookup");
        let track = state
            .music
            .track_by_id(track_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Track not found: {}", track_id)))?;
        return Ok(Json(json!({ "track": track })).into_response());
    }

    if query.top.as_deref() == Some("true") {
        let mut outcome = state.music.top_tracks(limit).await?;
        outcome.items.truncate(limit);
        return Ok(Json(json!({ "tracks": outcome.items })).into_response());
    }

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let tracks = state.music.search_tracks(q, limit).await?;
        return Ok(Json(json!({ "tracks": tracks })).into_response());
    }

    Err(ApiError::MissingParameter(
        "One of 'trackId', 'top' or 'q' is required".to_string(),
    ))
}
