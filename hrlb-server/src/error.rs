//! HTTP error mapping
//!
//! Every error body is `{"error": message}`; the leaderboard's empty result
//! also carries the tolerated fetch failures as `diagnostics`.

use crate::adapters::{AdapterError, FetchDiagnostic};
use crate::interactions::{ActionError, StoreError};
use crate::pipeline::LeaderboardError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed parameter value (400)
    #[error("{0}")]
    BadRequest(String),

    /// Unknown category tag (400)
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Required parameter absent (400)
    #[error("{0}")]
    MissingParameter(String),

    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Aggregation produced zero items (404)
    #[error("No content found for the specified criteria")]
    NoContent { diagnostics: Vec<FetchDiagnostic> },

    /// Upstream provider failure (500)
    #[error("Upstream error: {0}")]
    Upstream(#[from] AdapterError),

    /// Interaction store failure (500)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LeaderboardError> for ApiError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::NoContent { diagnostics } => ApiError::NoContent { diagnostics },
            LeaderboardError::Upstream(e) => ApiError::Upstream(e),
            LeaderboardError::AdapterMissing(category) => {
                ApiError::Internal(format!("No adapter registered for category {}", category))
            }
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::InvalidRating(_) | ActionError::MissingRating => {
                ApiError::BadRequest(err.to_string())
            }
            ActionError::Store(e) => ApiError::Store(e),
        }
    }
}

impl From<hrlb_common::Error> for ApiError {
    fn from(err: hrlb_common::Error) -> Self {
        match err {
            hrlb_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_)
            | ApiError::InvalidCategory(_)
            | ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::NoContent { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let message = self.to_string();
        let body = match self {
            ApiError::NoContent { diagnostics } => json!({
                "error": message,
                "diagnostics": diagnostics,
            }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let (status, body) = render(ApiError::InvalidCategory("podcast".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid category: podcast");

        let (status, _) = render(ApiError::Upstream(AdapterError::Auth("no key".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = render(ApiError::from(ActionError::MissingRating)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_no_content_carries_diagnostics() {
        let err = ApiError::from(LeaderboardError::NoContent {
            diagnostics: vec![FetchDiagnostic {
                source: "tmdb/movie page 2".to_string(),
                message: "API error 503: unavailable".to_string(),
            }],
        });

        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No content found for the specified criteria");
        assert_eq!(body["diagnostics"][0]["source"], "tmdb/movie page 2");
    }
}
