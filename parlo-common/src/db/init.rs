//! Database initialization
//!
//! Creates the SQLite database on first run, applies the idempotent schema,
//! and seeds default settings. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Default practice phrases served to the demo flow
const DEFAULT_PHRASES: &[&str] = &[
    "I appreciate your concern",
    "Let me investigate these allegations",
    "We take customer satisfaction seriously",
    "I'll provide a full statement shortly",
];

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers alongside the writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Wait briefly on lock contention instead of failing immediately
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
///
/// Also used by tests to prepare in-memory databases.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_demo_access_table(pool).await?;
    create_pronunciation_logs_table(pool).await?;
    create_demo_leads_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores configuration key-value pairs, including the global pause flag.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the demo_access table
///
/// One grant per email: token, remaining attempts, expiry, and the running
/// estimated cost for that grant.
pub async fn create_demo_access_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS demo_access (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            access_token TEXT NOT NULL UNIQUE,
            attempts_remaining INTEGER NOT NULL DEFAULT 5,
            expires_at TIMESTAMP NOT NULL,
            pre_ordered INTEGER NOT NULL DEFAULT 0,
            accumulated_cost REAL NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (attempts_remaining >= 0),
            CHECK (accumulated_cost >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Token lookups always pair with an expiry check
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_demo_access_token_expiry ON demo_access(access_token, expires_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_demo_access_email ON demo_access(email)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the pronunciation_logs table
///
/// Append-only record of scoring attempts, used for cost aggregation and
/// usage stats.
pub async fn create_pronunciation_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pronunciation_logs (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            phrase TEXT NOT NULL,
            score INTEGER NOT NULL,
            estimated_cost REAL NOT NULL DEFAULT 0,
            client_ip TEXT,
            feedback TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (score >= 0 AND score <= 100),
            CHECK (estimated_cost >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Cost aggregation queries group by day and filter by email
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pronunciation_logs_email_created ON pronunciation_logs(email, created_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pronunciation_logs_created ON pronunciation_logs(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the demo_leads table
pub async fn create_demo_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS demo_leads (
            guid TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            first_name TEXT,
            source TEXT NOT NULL CHECK (source IN ('demo_complete', 'email_capture')),
            demo_score REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (demo_score IS NULL OR (demo_score >= 0 AND demo_score <= 100))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all tunable values exist with defaults. Thresholds deliberately
/// live here rather than as compile-time constants so operators can adjust
/// them without a rebuild.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Demo access settings
    ensure_setting(pool, "demo_max_attempts", "5").await?;
    ensure_setting(pool, "demo_session_hours", "24").await?;

    // Scoring settings
    ensure_setting(pool, "demo_max_phrase_chars", "200").await?;
    ensure_setting(pool, "demo_base_score", "75").await?;
    ensure_setting(pool, "demo_progress_threshold", "60").await?;
    ensure_setting(pool, "demo_word_issue_threshold", "70").await?;

    // Cost monitoring settings
    ensure_setting(pool, "demo_daily_cost_limit", "25.0").await?;
    ensure_setting(pool, "demo_cost_warning_threshold", "20.0").await?;
    ensure_setting(pool, "demo_cost_per_minute", "0.001").await?;
    ensure_setting(pool, "demo_fallback_attempt_cost", "0.0005").await?;

    // Pre-order pricing shown on the landing page
    ensure_setting(pool, "demo_regular_price", "47.0").await?;
    ensure_setting(pool, "demo_preorder_price", "23.5").await?;
    ensure_setting(pool, "demo_preorder_discount_percent", "50").await?;
    ensure_setting(pool, "demo_preorder_duration_months", "3").await?;

    // Checkout stub settings
    ensure_setting(pool, "checkout_plan_id", "starter-monthly").await?;
    ensure_setting(pool, "public_base_url", "http://127.0.0.1:5730").await?;

    // Practice phrases served to the demo flow, stored as a JSON array
    let phrases = serde_json::to_string(DEFAULT_PHRASES)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode default phrases: {}", e)))?;
    ensure_setting(pool, "demo_phrases", &phrases).await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it is created with the default.
/// If the setting exists but has a NULL value, it is reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        tracing::warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
