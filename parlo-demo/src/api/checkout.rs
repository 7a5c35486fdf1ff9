//! Stubbed checkout endpoints
//!
//! No payment provider is wired up. Session creation hands back a mock
//! hosted-checkout URL and the webhook only logs what arrives.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::error::ApiResult;
use crate::validate::validate_email;
use crate::AppState;

/// Request payload for checkout session creation
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    #[serde(default)]
    pub plan: Option<String>,
}

/// Response payload carrying the mock hosted-checkout URL
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub plan: String,
}

/// Percent-encode a query value (unreserved characters pass through)
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// POST /api/checkout/session
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> ApiResult<Json<CheckoutResponse>> {
    let email = validate_email(&payload.email)?;
    let plan = payload
        .plan
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.settings.checkout_plan_id.clone());

    let checkout_url = format!(
        "{}/checkout/mock?plan={}&email={}",
        state.settings.public_base_url.trim_end_matches('/'),
        encode_query_value(&plan),
        encode_query_value(&email),
    );

    info!("Mock checkout session created for {} (plan {})", email, plan);
    Ok(Json(CheckoutResponse { checkout_url, plan }))
}

/// POST /api/checkout/webhook
///
/// Accepts whatever the payment provider would send and logs it. Malformed
/// payloads are acknowledged too so the (hypothetical) provider stops
/// retrying.
pub async fn webhook(body: Bytes) -> Json<serde_json::Value> {
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => {
            let event_type = payload
                .get("event_type")
                .or_else(|| payload.get("type"))
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            info!("Checkout webhook received: event_type={}", event_type);
        }
        Err(_) => {
            info!("Checkout webhook received: non-JSON payload, {} bytes", body.len());
        }
    }

    Json(json!({ "received": true }))
}

/// Build checkout routes
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/checkout/session", post(create_session))
        .route("/api/checkout/webhook", post(webhook))
}
