//! Error types for the store API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use database::DatabaseError;
use thiserror::Error;

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed client input.
    #[error("{0}")]
    BadRequest(String),

    /// No store configuration for the requested shop.
    #[error("{0}")]
    NotFound(String),

    /// Storage or schema failure. `expose_detail` controls whether the
    /// underlying message is echoed to the client.
    #[error("Internal error: {source}")]
    Internal {
        source: DatabaseError,
        expose_detail: bool,
    },
}

impl ApiError {
    /// Classify an error from a read endpoint. Server-side detail stays in the logs.
    pub fn from_read(err: DatabaseError) -> Self {
        Self::classify(err, false)
    }

    /// Classify an error from a write endpoint. Server-side detail is echoed
    /// to the client for diagnostics.
    pub fn from_write(err: DatabaseError) -> Self {
        Self::classify(err, true)
    }

    fn classify(err: DatabaseError, expose_detail: bool) -> Self {
        match err {
            DatabaseError::InvalidRequest(message) => ApiError::BadRequest(message),
            DatabaseError::NotFound { .. } => {
                ApiError::NotFound("No information found for this store.".to_string())
            }
            source => ApiError::Internal {
                source,
                expose_detail,
            },
        }
    }
}

/// Unreadable bodies (wrong content type, malformed JSON) are client errors
/// and answer with the same JSON shape as every other 4xx.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::BadRequest(message) => {
                tracing::warn!("Bad request: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    serde_json::json!({ "message": message }),
                )
            }
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "message": message }),
            ),
            ApiError::Internal {
                source,
                expose_detail,
            } => {
                tracing::error!(error = %source, "Store operation failed");
                let body = if *expose_detail {
                    serde_json::json!({
                        "message": "Internal server error",
                        "error": source.to_string(),
                    })
                } else {
                    serde_json::json!({ "message": "Internal server error" })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
