//! Mapping of core errors onto HTTP responses.
//!
//! Client-caused errors get a specific status and message. Infrastructure
//! errors collapse into one opaque 500; every authorization rejection
//! collapses into one opaque 401.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ApiResponse;
use crate::shared::{AuthError, Rejection};

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuthError::Conflict => (StatusCode::CONFLICT, self.to_string()),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AuthError::DeadlineExceeded(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable".to_string(),
            ),
            AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::Signing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(UNAUTHORIZED_MESSAGE)),
        )
            .into_response()
    }
}
