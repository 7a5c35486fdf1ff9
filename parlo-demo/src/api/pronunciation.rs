//! Pronunciation analysis endpoint
//!
//! The gate runs in fixed precedence: pause flag, token presence, token
//! lookup, attempts/expiry. The pause flag goes first so a paused demo does
//! no grant lookups at all. The flag can still flip between the gate check
//! and the atomic consume; that race only tightens behavior, so it is left
//! alone.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::api::demo::demo_token;
use crate::costs::estimate_attempt_cost;
use crate::db::{access, logs};
use crate::error::{ApiError, ApiResult};
use crate::scoring::{score_phrase, PhraseScore, ScoringConfig, WordReport};
use crate::validate::validate_phrase;
use crate::AppState;
use parlo_common::db::settings::is_demo_paused;

/// Upload size cap for the analyze endpoint (phrase + optional audio)
const MAX_ANALYZE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Response payload for one analysis
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub score: i64,
    pub can_progress: bool,
    pub feedback: Vec<String>,
    pub attempts_remaining: i64,
    pub pronunciation_report: Vec<WordReport>,
}

/// Fields extracted from the multipart body
struct AnalyzeUpload {
    phrase: Option<String>,
    audio_bytes: Option<usize>,
}

/// Drain the multipart body, keeping the phrase text and the audio size
///
/// The audio is never decoded or stored; its size alone feeds the cost
/// estimate.
async fn read_upload(mut multipart: Multipart) -> ApiResult<AnalyzeUpload> {
    let mut upload = AnalyzeUpload {
        phrase: None,
        audio_bytes: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("phrase") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable phrase field: {}", e)))?;
                upload.phrase = Some(text);
            }
            Some("audio") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable audio field: {}", e)))?;
                if !bytes.is_empty() {
                    upload.audio_bytes = Some(bytes.len());
                }
            }
            _ => {} // unknown fields are ignored
        }
    }

    Ok(upload)
}

/// POST /api/pronunciation/analyze
///
/// Multipart `phrase` (required) and `audio` (optional). Consumes one
/// attempt on success and appends a log row for cost aggregation.
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeResponse>> {
    let now = Utc::now();

    // Gate, in precedence order
    if is_demo_paused(&state.db, now).await? {
        return Err(ApiError::DemoPaused);
    }
    let token = demo_token(&headers)?;
    let grant = access::find_by_token(&state.db, &token)
        .await?
        .ok_or(ApiError::InvalidToken)?;
    if !grant.can_attempt(now) {
        return Err(ApiError::AccessLimitReached);
    }

    let upload = read_upload(multipart).await?;
    let phrase = validate_phrase(
        upload.phrase.as_deref().unwrap_or(""),
        state.settings.max_phrase_chars,
    )?;

    let result: PhraseScore = score_phrase(
        &phrase,
        &ScoringConfig::from(&state.settings),
        &mut rand::thread_rng(),
    );

    let cost = estimate_attempt_cost(
        upload.audio_bytes,
        state.settings.cost_per_minute,
        state.settings.fallback_attempt_cost,
    );

    // Atomic decrement; a concurrent call may have drained the last attempt
    let attempts_remaining = access::consume_attempt(&state.db, &token, cost, now)
        .await?
        .ok_or(ApiError::AccessLimitReached)?;

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    logs::record_attempt(
        &state.db,
        &grant.email,
        &phrase,
        result.score,
        cost,
        client_ip.as_deref(),
        &result.feedback,
        now,
    )
    .await?;

    info!(
        "Scored attempt for {}: {} (cost ${:.4}, {} attempts left)",
        grant.email, result.score, cost, attempts_remaining
    );

    Ok(Json(AnalyzeResponse {
        score: result.score,
        can_progress: result.can_progress,
        feedback: result.feedback,
        attempts_remaining,
        pronunciation_report: result.words,
    }))
}

/// Build pronunciation routes
pub fn pronunciation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pronunciation/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_ANALYZE_BODY_BYTES))
}
