//! Error types for fpt-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or wrong admin password (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// fpt-common error
    #[error(transparent)]
    Common(#[from] fpt_common::Error),
}

/// HTTP status for a library error
pub fn status_for(err: &fpt_common::Error) -> StatusCode {
    use fpt_common::Error;

    match err {
        Error::InvalidInput(_) | Error::Csv(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::SourceUnavailable(_) | Error::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => {
                let status = status_for(err);
                let code = match status {
                    StatusCode::BAD_REQUEST => "BAD_REQUEST",
                    StatusCode::NOT_FOUND => "NOT_FOUND",
                    StatusCode::SERVICE_UNAVAILABLE => "SOURCE_UNAVAILABLE",
                    _ => "INTERNAL_ERROR",
                };
                (status, code, err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status() {
        assert_eq!(
            status_for(&fpt_common::Error::Csv("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&fpt_common::Error::Timeout(3000)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&fpt_common::Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError::Unauthorized("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ApiError::from(fpt_common::Error::NotFound("f".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
