//! The error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use browsermux_session::SessionError;

/// An API failure: HTTP status plus the `{"error": {"code", "message"}}`
/// body the original service exposed.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "InvalidRequest",
            message: message.into(),
        }
    }

    /// Map a session-layer error, using `failure_code` for anything that is
    /// not a not-found condition. The code names the operation that failed
    /// (`NavigationFailed`, `ExecutionFailed`, ...), so the same underlying
    /// error reads differently per endpoint — as it should.
    pub fn from_session(err: SessionError, failure_code: &'static str) -> Self {
        match err {
            SessionError::SessionNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                code: "SessionNotFound",
                message: err.to_string(),
            },
            SessionError::PageNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                code: "PageNotFound",
                message: err.to_string(),
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: failure_code,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}
