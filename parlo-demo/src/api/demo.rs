//! Demo access and lead-capture endpoints
//!
//! Access grants are issued per email, reused while still usable, and
//! checked through the `X-Demo-Token` header on every follow-up call.

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::db::{access, leads};
use crate::error::{ApiError, ApiResult};
use crate::validate::{check_honeypot, validate_email};
use crate::AppState;
use parlo_common::db::models::LeadSource;

/// Header carrying the demo access token
pub const DEMO_TOKEN_HEADER: &str = "X-Demo-Token";

/// Extract the demo token from request headers
pub fn demo_token(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get(DEMO_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::TokenRequired)
}

/// Request payload for demo access
#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub email: String,
    /// Honeypot; humans never see this field, so any value rejects
    #[serde(default)]
    pub website: Option<String>,
}

/// Response payload for issued or restored access
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub access_token: String,
    pub attempts_remaining: i64,
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

/// POST /api/demo/access
///
/// Issues a grant for the email, or returns the existing one while it still
/// has attempts and time left.
pub async fn request_access(
    State(state): State<AppState>,
    Json(payload): Json<AccessRequest>,
) -> ApiResult<Json<AccessResponse>> {
    check_honeypot(payload.website.as_deref())?;
    let email = validate_email(&payload.email)?;

    let (grant, restored) = access::issue_grant(
        &state.db,
        &email,
        state.settings.max_attempts,
        state.settings.session_hours,
        Utc::now(),
    )
    .await?;

    let message = if restored {
        "Access restored".to_string()
    } else {
        // Email delivery is stubbed; the welcome mail is a log line
        info!("Welcome email queued (stub) for {}", email);
        "Access granted".to_string()
    };

    Ok(Json(AccessResponse {
        access_token: grant.access_token,
        attempts_remaining: grant.attempts_remaining,
        expires_at: grant.expires_at,
        message,
    }))
}

/// Response payload for the grant status check
#[derive(Debug, Serialize)]
pub struct AccessStatusResponse {
    pub email: String,
    pub attempts_remaining: i64,
    pub expires_at: DateTime<Utc>,
    pub can_attempt: bool,
    pub pre_ordered: bool,
}

/// GET /api/demo/access/check
pub async fn check_access(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AccessStatusResponse>> {
    let token = demo_token(&headers)?;
    let grant = access::find_by_token(&state.db, &token)
        .await?
        .ok_or(ApiError::InvalidToken)?;

    Ok(Json(AccessStatusResponse {
        can_attempt: grant.can_attempt(Utc::now()),
        email: grant.email,
        attempts_remaining: grant.attempts_remaining,
        expires_at: grant.expires_at,
        pre_ordered: grant.pre_ordered,
    }))
}

/// POST /api/demo/access/pre-order
pub async fn pre_order(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let token = demo_token(&headers)?;
    if !access::mark_pre_ordered(&state.db, &token).await? {
        return Err(ApiError::InvalidToken);
    }

    info!("Grant marked as pre-ordered");
    Ok(Json(json!({
        "message": "Pre-order recorded",
        "pre_ordered": true,
    })))
}

/// GET /api/demo/config
///
/// Public configuration consumed by the landing page.
pub async fn demo_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let s = &state.settings;
    Json(json!({
        "max_attempts": s.max_attempts,
        "session_hours": s.session_hours,
        "pricing": {
            "regular_price": s.regular_price,
            "preorder_price": s.preorder_price,
            "discount_percent": s.preorder_discount_percent,
            "preorder_duration_months": s.preorder_duration_months,
        },
    }))
}

/// GET /api/demo/phrases
///
/// Practice phrases for the demo flow.
pub async fn phrases(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "phrases": state.settings.phrases }))
}

/// Request payload for lead capture
#[derive(Debug, Deserialize)]
pub struct LeadRequest {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub demo_score: Option<f64>,
    #[serde(default)]
    pub source: Option<LeadSource>,
}

/// POST /api/demo/email
pub async fn capture_email(
    State(state): State<AppState>,
    Json(payload): Json<LeadRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let email = validate_email(&payload.email)?;

    // An explicit source wins; otherwise a score marks a completed demo
    let source = payload.source.unwrap_or(if payload.demo_score.is_some() {
        LeadSource::DemoComplete
    } else {
        LeadSource::EmailCapture
    });

    leads::upsert_lead(
        &state.db,
        &email,
        payload.first_name.as_deref(),
        source,
        payload.demo_score,
    )
    .await?;

    info!("Lead captured: {} ({})", email, source.as_str());
    Ok(Json(json!({ "message": "Thanks! We'll keep you posted." })))
}

/// Build demo routes
pub fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/demo/access", post(request_access))
        .route("/api/demo/access/check", get(check_access))
        .route("/api/demo/access/pre-order", post(pre_order))
        .route("/api/demo/config", get(demo_config))
        .route("/api/demo/phrases", get(phrases))
        .route("/api/demo/email", post(capture_email))
}
