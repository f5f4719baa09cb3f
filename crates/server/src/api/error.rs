//! Error responses shared by the API handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use animerate_core::{ErrorKind, ServiceError};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
            details: None,
        }),
    )
}

/// Map a service error to a response. Internal failures are logged and
/// returned without detail.
pub fn service_error(e: ServiceError) -> ApiError {
    let status = match e.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyDone | ErrorKind::NotDone | ErrorKind::Validation => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Internal => {
            error!("Request failed: {}", e);
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.code(),
                "Internal server error",
            );
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            code: e.code().to_string(),
            details: e.details(),
        }),
    )
}

fn validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "VALIDATION", message)
}

/// Platform user ids are numeric snowflakes; anything without a digit is rejected.
pub fn require_user(user: Option<&str>) -> Result<&str, ApiError> {
    match user.map(str::trim) {
        Some(user) if !user.is_empty() && user.chars().any(|c| c.is_ascii_digit()) => Ok(user),
        Some(_) => Err(validation_error("user must be a platform user id")),
        None => Err(validation_error("user is required")),
    }
}

/// Like [`require_user`], for endpoints where the user is optional.
pub fn optional_user(user: Option<&str>) -> Result<Option<&str>, ApiError> {
    match user {
        Some(_) => require_user(user).map(Some),
        None => Ok(None),
    }
}

pub fn require_query(query: Option<&str>) -> Result<&str, ApiError> {
    match query.map(str::trim) {
        Some(query) if !query.is_empty() => Ok(query),
        _ => Err(validation_error("query must not be empty")),
    }
}

pub fn require_score(score: Option<&serde_json::Value>) -> Result<f64, ApiError> {
    score
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| validation_error("score must be a number"))
}
