//! Structured API errors shared by all route handlers

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Error taxonomy for the HTTP surface.
///
/// Every variant renders as `{"error": "<message>"}` with its contractual
/// status code. Local faults (validation, lifecycle, permissions) are
/// detected before any side effect; `Upstream` marks aggregation-service or
/// storage failures and maps to 502 so callers can tell them apart from
/// faults in this service.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    InvalidState(String),
    Validation(String),
    Upstream(String),
    Configuration(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Configuration(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::InvalidState(m)
            | ApiError::Validation(m)
            | ApiError::Upstream(m)
            | ApiError::Configuration(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            eprintln!("[api] {}: {}", status, self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Extension trait for logging errors and converting to ApiError
pub trait LogErr<T> {
    /// Log error with context and return `ApiError::Internal`
    fn log_500(self, context: &str) -> Result<T, ApiError>;

    /// Log error with context and return `ApiError::Upstream`
    fn log_upstream(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> LogErr<T> for Result<T, E> {
    fn log_500(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            eprintln!("{}: {}", context, e);
            ApiError::Internal(context.to_string())
        })
    }

    fn log_upstream(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| {
            eprintln!("{}: {}", context, e);
            ApiError::Upstream(e.to_string())
        })
    }
}
