//! Settings database access
//!
//! Read/write settings from the settings table (key-value store). All
//! settings are global/system-wide. The global pause flag lives here too,
//! as a timestamp-valued entry with TTL semantics, so every server
//! instance sharing the database observes the same pause state.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::warn;

/// Settings key holding the pause expiry timestamp (RFC 3339)
const PAUSED_UNTIL_KEY: &str = "demo_paused_until";

/// Runtime tunables for the demo service, loaded once at startup
///
/// Cost thresholds are deliberately absent: the cost monitor reads them
/// fresh on every run via [`get_daily_cost_limit`] and
/// [`get_cost_warning_threshold`].
#[derive(Debug, Clone)]
pub struct DemoSettings {
    pub max_attempts: i64,
    pub session_hours: i64,
    pub max_phrase_chars: usize,
    pub base_score: i64,
    pub progress_threshold: i64,
    pub word_issue_threshold: i64,
    pub cost_per_minute: f64,
    pub fallback_attempt_cost: f64,
    pub regular_price: f64,
    pub preorder_price: f64,
    pub preorder_discount_percent: i64,
    pub preorder_duration_months: i64,
    pub checkout_plan_id: String,
    pub public_base_url: String,
    pub phrases: Vec<String>,
}

impl DemoSettings {
    /// Load tunables from the settings table, falling back to defaults for
    /// missing keys
    pub async fn load(db: &Pool<Sqlite>) -> Result<Self> {
        let phrases = match get_setting::<String>(db, "demo_phrases").await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| Error::Config(format!("Invalid demo_phrases JSON: {}", e)))?,
            None => Vec::new(),
        };

        Ok(Self {
            max_attempts: get_setting(db, "demo_max_attempts").await?.unwrap_or(5).max(1),
            session_hours: get_setting(db, "demo_session_hours").await?.unwrap_or(24).max(1),
            max_phrase_chars: get_setting::<i64>(db, "demo_max_phrase_chars")
                .await?
                .unwrap_or(200)
                .clamp(1, 10_000) as usize,
            base_score: get_setting(db, "demo_base_score").await?.unwrap_or(75),
            progress_threshold: get_setting(db, "demo_progress_threshold").await?.unwrap_or(60),
            word_issue_threshold: get_setting(db, "demo_word_issue_threshold")
                .await?
                .unwrap_or(70),
            cost_per_minute: get_setting(db, "demo_cost_per_minute").await?.unwrap_or(0.001),
            fallback_attempt_cost: get_setting(db, "demo_fallback_attempt_cost")
                .await?
                .unwrap_or(0.0005),
            regular_price: get_setting(db, "demo_regular_price").await?.unwrap_or(47.0),
            preorder_price: get_setting(db, "demo_preorder_price").await?.unwrap_or(23.5),
            preorder_discount_percent: get_setting(db, "demo_preorder_discount_percent")
                .await?
                .unwrap_or(50),
            preorder_duration_months: get_setting(db, "demo_preorder_duration_months")
                .await?
                .unwrap_or(3),
            checkout_plan_id: get_setting(db, "checkout_plan_id")
                .await?
                .unwrap_or_else(|| "starter-monthly".to_string()),
            public_base_url: get_setting(db, "public_base_url")
                .await?
                .unwrap_or_else(|| "http://127.0.0.1:5730".to_string()),
            phrases,
        })
    }
}

/// Get the hard daily cost limit in dollars
pub async fn get_daily_cost_limit(db: &Pool<Sqlite>) -> Result<f64> {
    Ok(get_setting(db, "demo_daily_cost_limit").await?.unwrap_or(25.0))
}

/// Get the soft warning threshold in dollars
pub async fn get_cost_warning_threshold(db: &Pool<Sqlite>) -> Result<f64> {
    Ok(get_setting(db, "demo_cost_warning_threshold").await?.unwrap_or(20.0))
}

/// Pause demo scoring until the given instant
pub async fn pause_demo_until(db: &Pool<Sqlite>, until: DateTime<Utc>) -> Result<()> {
    set_setting(db, PAUSED_UNTIL_KEY, until.to_rfc3339()).await
}

/// Clear the pause flag
pub async fn resume_demo(db: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(PAUSED_UNTIL_KEY)
        .execute(db)
        .await?;
    Ok(())
}

/// Read the pause expiry, if any is recorded
pub async fn demo_paused_until(db: &Pool<Sqlite>) -> Result<Option<DateTime<Utc>>> {
    let raw = get_setting::<String>(db, PAUSED_UNTIL_KEY).await?;
    match raw {
        Some(s) => match DateTime::parse_from_rfc3339(&s) {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(e) => {
                // A corrupt flag must not brick scoring; treat as unset
                warn!("Unparseable {} value '{}': {}", PAUSED_UNTIL_KEY, s, e);
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// True while a pause expiry is recorded and still in the future
pub async fn is_demo_paused(db: &Pool<Sqlite>, now: DateTime<Utc>) -> Result<bool> {
    Ok(matches!(demo_paused_until(db).await?, Some(until) if until > now))
}

/// Generic setting getter
///
/// Returns None if the key doesn't exist. Parses the stored string using
/// FromStr.
pub async fn get_setting<T: FromStr>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => match s.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(Error::Config(format!(
                "Failed to parse setting '{}' value: {}",
                key, s
            ))),
        },
        None => Ok(None),
    }
}

/// Generic setting setter (insert or update)
pub async fn set_setting<T: ToString>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;

    Ok(())
}
