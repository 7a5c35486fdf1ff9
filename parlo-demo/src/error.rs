//! API error types for parlo-demo
//!
//! Every handler returns `ApiResult<T>`; failures map onto the demo error
//! taxonomy: validation 422, authorization 401, attempts exhausted 429,
//! pause active 503, everything else 500 with details logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// One field-level validation failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation (422) with field-level messages
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Honeypot field was non-empty (422) - suspected automated submission
    #[error("Automated submission detected")]
    BotDetected,

    /// No demo token supplied (401)
    #[error("Demo access token required")]
    TokenRequired,

    /// Token does not match any known grant (401)
    #[error("Invalid or unknown demo access token")]
    InvalidToken,

    /// Grant expired or attempts exhausted (429)
    #[error("Demo attempt limit reached or access expired")]
    AccessLimitReached,

    /// Global pause flag is set (503)
    #[error("Demo temporarily unavailable")]
    DemoPaused,

    /// Malformed request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// parlo-common error
    #[error("Common error: {0}")]
    Common(#[from] parlo_common::Error),
}

impl ApiError {
    /// Shorthand for a single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, fields) = match self {
            ApiError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "The given data was invalid".to_string(),
                Some(fields),
            ),
            ApiError::BotDetected => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BOT_DETECTED",
                "Automated submission detected".to_string(),
                None,
            ),
            ApiError::TokenRequired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_REQUIRED",
                "Demo access token required".to_string(),
                None,
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or unknown demo access token".to_string(),
                None,
            ),
            ApiError::AccessLimitReached => (
                StatusCode::TOO_MANY_REQUESTS,
                "ACCESS_LIMIT_REACHED",
                "Demo attempt limit reached or access expired".to_string(),
                None,
            ),
            ApiError::DemoPaused => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DEMO_PAUSED",
                "The demo is temporarily unavailable. Please try again later.".to_string(),
                None,
            ),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None)
            }
            ApiError::Internal(ref msg) => {
                // Details stay server-side; callers get a generic message
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            ApiError::Common(ref err) => {
                error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error_body = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(fields) = fields {
            let map: serde_json::Map<String, serde_json::Value> = fields
                .into_iter()
                .map(|f| (f.field, serde_json::Value::String(f.message)))
                .collect();
            error_body["fields"] = serde_json::Value::Object(map);
        }

        let body = Json(json!({ "error": error_body }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
