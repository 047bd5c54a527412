//! User interaction endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use hrlb_common::UserInteraction;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::interactions::{find_interaction, record_action, InteractionAction};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct InteractionsResponse {
    pub interactions: Vec<UserInteraction>,
}

/// POST body
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub action: InteractionAction,
    /// Required by `rate`, ignored otherwise
    pub rating: Option<f64>,
}

/// GET /users/:user_id/interactions
pub async fn list_interactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<InteractionsResponse>> {
    let interactions = state.interactions.get(&user_id).await?;
    Ok(Json(InteractionsResponse { interactions }))
}

/// GET /users/:user_id/interactions/:content_id
pub async fn get_interaction(
    State(state): State<AppState>,
    Path((user_id, content_id)): Path<(String, String)>,
) -> ApiResult<Json<UserInteraction>> {
    find_interaction(state.interactions.as_ref(), &user_id, &content_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No interaction recorded for user {} and content {}",
                user_id, content_id
            ))
        })
}

/// POST /users/:user_id/interactions/:content_id
pub async fn post_interaction(
    State(state): State<AppState>,
    Path((user_id, content_id)): Path<(String, String)>,
    payload: Result<Json<InteractionRequest>, JsonRejection>,
) -> ApiResult<Json<UserInteraction>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let record = record_action(
        state.interactions.as_ref(),
        &user_id,
        &content_id,
        request.action,
        request.rating,
    )
    .await?;

    Ok(Json(record))
}
