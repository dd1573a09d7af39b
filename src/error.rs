//! Status server error types with HTTP status code mapping.
//!
//! [`StatusError`] is the central error type for the server. Variants that
//! can surface in an HTTP response map to a status code and a structured
//! JSON body; the remaining variants are only ever logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "bad request: malformed percent escape"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Failure to write a frame to a single WebSocket session.
///
/// Only this error removes a session from the registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The underlying transport rejected the frame.
    #[error("transport send failed: {0}")]
    Transport(String),

    /// The session was already closed locally.
    #[error("session closed")]
    Closed,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status               |
/// |-----------|-------------------|---------------------------|
/// | 1000–1999 | Request           | 400 Bad Request           |
/// | 2000–2999 | Lookup            | 404 Not Found             |
/// | 3000–3999 | Server            | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The request path could not be decoded.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Nothing to serve for the requested path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The listener could not be bound or the worker pool could not start.
    #[error("could not start local server: {0}")]
    Bind(#[source] std::io::Error),

    /// A session failed during the initial replay and was discarded.
    #[error("session send failed: {0}")]
    Send(#[from] SessionError),

    /// A snapshot could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// An environment variable held an unusable value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The request could not be classified because the blocking lookup
    /// task did not complete.
    #[error("routing failed: {0}")]
    Routing(String),
}

impl StatusError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::BadRequest(_) => 1001,
            Self::NotFound(_) => 2001,
            Self::Bind(_) => 3001,
            Self::Send(_) => 3002,
            Self::Serialize(_) => 3003,
            Self::Config(_) => 3004,
            Self::Routing(_) => 3005,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Bind(_)
            | Self::Send(_)
            | Self::Serialize(_)
            | Self::Config(_)
            | Self::Routing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let err = StatusError::BadRequest("malformed".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = StatusError::NotFound("/missing.xyz".to_string());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn session_error_converts() {
        let err: StatusError = SessionError::Closed.into();
        assert!(matches!(err, StatusError::Send(SessionError::Closed)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn routing_failure_maps_to_500() {
        let err = StatusError::Routing("task cancelled".to_string());
        assert_eq!(err.error_code(), 3005);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
