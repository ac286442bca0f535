//! Web API module for Atelier
//!
//! REST + SSE endpoints for:
//! - Artifact CRUD and version history
//! - Streaming create/update runs (SSE delta streams)
//! - Health checks

pub mod artifacts;
pub mod health;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use serde::Serialize;

pub use artifacts::artifacts_routes;
pub use health::health_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new().merge(health_routes()).merge(artifacts_routes())
}

/// Standard API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// API error with an HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<atelier_artifact::Error> for ApiError {
    fn from(err: atelier_artifact::Error) -> Self {
        use atelier_artifact::Error;
        let status = match &err {
            Error::ArtifactNotFound(_) | Error::VersionNotFound { .. } => StatusCode::NOT_FOUND,
            Error::RunConflict(_) => StatusCode::CONFLICT,
            Error::HandlerMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        });
        (self.status, body).into_response()
    }
}
