//! Error types.
//!
//! Oracle and session failures are plain values that callers match on.
//! `ApiError` is the HTTP-facing wrapper that renders every failure as a
//! structured JSON body instead of dropping the connection.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure talking to the generative model.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No API key configured.
    #[error("No API key configured for the model (set GOOGLE_API_KEY)")]
    MissingApiKey,

    /// Connection or transport failure.
    #[error("Cannot reach model API: {0}")]
    Transport(String),

    /// Request or media processing exceeded its deadline.
    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    /// Rate limit or quota exhausted.
    #[error("Model quota exceeded: {0}")]
    Quota(String),

    /// Non-success HTTP status from the API.
    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Uploaded media failed server-side processing.
    #[error("Media processing failed: {0}")]
    Processing(String),

    /// The reply contained no text.
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// The reply body could not be decoded.
    #[error("Failed to decode model response: {0}")]
    Decode(String),
}

/// Session lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Oracle failure (502, or 504 for timeouts)
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => ApiError::NotFound(format!("session {}", id)),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("malformed multipart body: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Oracle(OracleError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "ORACLE_TIMEOUT")
            }
            ApiError::Oracle(_) => (StatusCode::BAD_GATEWAY, "ORACLE_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", self);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
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
    fn test_oracle_timeout_maps_to_gateway_timeout() {
        let response = ApiError::from(OracleError::Timeout(60)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_oracle_error_maps_to_bad_gateway() {
        let response = ApiError::from(OracleError::Quota("daily limit".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        let err: ApiError = SessionError::NotFound("abc".into()).into();
        assert!(err.to_string().contains("abc"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
