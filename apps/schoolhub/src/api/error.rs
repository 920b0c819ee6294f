//! API error type and its JSON rendering.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schoolhub_core::CoreError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::Conflict(msg) => Self::Conflict(msg),
            CoreError::Unauthorized(msg) => Self::Unauthorized(msg),
            CoreError::Storage(_) | CoreError::Codec(_) => {
                error!(error = %err, "database failure");
                Self::Internal("Internal server error".into())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!(error = %err, "blocking task failed");
        Self::Internal("Internal server error".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({"message": self.to_string(), "success": false}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (CoreError::not_found("Student", "id", 9), StatusCode::NOT_FOUND),
            (CoreError::validation("bad"), StatusCode::BAD_REQUEST),
            (CoreError::conflict("taken"), StatusCode::CONFLICT),
            (CoreError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
        ];
        for (core, status) in cases {
            assert_eq!(ApiError::from(core).status(), status);
        }
    }

    #[test]
    fn not_found_keeps_core_message() {
        let err = ApiError::from(CoreError::not_found("Student", "id", 9));
        assert_eq!(err.to_string(), "Student not found with id : '9'");
    }
}
