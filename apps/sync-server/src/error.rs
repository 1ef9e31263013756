//! Error types for the control surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use idsync::SyncError;

/// Control surface errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, path or parameter.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Another pass was in flight, so this one was skipped.
    #[error("Sync already in progress, skipped")]
    SyncInProgress,

    /// A reconciliation pass ran and failed.
    #[error("{0}")]
    SyncFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SyncInProgress => StatusCode::CONFLICT,
            ApiError::SyncFailed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::SyncInProgress => "sync_in_progress",
            ApiError::SyncFailed(_) => "sync_failed",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::InvalidConfig(_) | SyncError::InvalidInput(_) => {
                ApiError::BadRequest(error.to_string())
            }
            SyncError::UserNotFound(_) => ApiError::NotFound(error.to_string()),
            SyncError::Connectivity { .. } | SyncError::Write { .. } => {
                ApiError::SyncFailed(error.to_string())
            }
            _ => ApiError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_mapping() {
        let err: ApiError = SyncError::UserNotFound("a@x.com".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");

        let err: ApiError = SyncError::InvalidConfig("interval".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::SyncInProgress.status(), StatusCode::CONFLICT);

        let err: ApiError = SyncError::Internal("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
    }
}
