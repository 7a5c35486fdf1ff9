//! Cost estimation and the daily cost monitor
//!
//! Each scoring call carries an estimated speech-API cost even though no
//! speech API is ever called; the estimate is what the real integration
//! would bill. The monitor sums today's estimates and trips a warning or the
//! global pause flag when the configured thresholds are crossed.

use crate::db::logs;
use chrono::{DateTime, Duration, Utc};
use parlo_common::db::settings::{get_cost_warning_threshold, get_daily_cost_limit, pause_demo_until};
use parlo_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Outcome of one monitor run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostStatus {
    /// Below the warning threshold
    Ok,
    /// At or above the warning threshold, below the hard limit
    Warning,
    /// At or above the hard daily limit; demo paused
    Paused,
}

/// Report produced by [`run_cost_monitor`]
#[derive(Debug, Clone)]
pub struct CostReport {
    pub total_today: f64,
    pub warning_threshold: f64,
    pub daily_limit: f64,
    pub status: CostStatus,
    pub paused_until: Option<DateTime<Utc>>,
}

/// Estimate the cost of one scoring attempt
///
/// With audio: size KiB / 8 approximates seconds at the demo's upload
/// bitrate, converted to minutes and multiplied by the per-minute rate.
/// Without audio: a flat per-attempt placeholder.
pub fn estimate_attempt_cost(
    audio_bytes: Option<usize>,
    cost_per_minute: f64,
    fallback_attempt_cost: f64,
) -> f64 {
    match audio_bytes {
        Some(bytes) => {
            let seconds = bytes as f64 / 1024.0 / 8.0;
            round4(seconds / 60.0 * cost_per_minute)
        }
        None => round4(fallback_attempt_cost),
    }
}

/// Round to 4 decimal places (fractions of a cent)
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Start of the given instant's UTC day
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// End of the given instant's UTC day (start of the next day)
pub fn end_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_utc_day(now) + Duration::days(1)
}

/// Sum today's costs and apply the threshold logic
///
/// At or above the hard limit the pause flag is set until end of the
/// current UTC day, so scoring stays blocked for the rest of the day and
/// resumes implicitly tomorrow. The alert "emails" are log lines; nothing
/// is actually delivered.
pub async fn run_cost_monitor(db: &SqlitePool, now: DateTime<Utc>) -> Result<CostReport> {
    let day_start = start_of_utc_day(now);
    let day_end = end_of_utc_day(now);

    let total_today = logs::cost_in_window(db, day_start, day_end).await?;
    let daily_limit = get_daily_cost_limit(db).await?;
    let warning_threshold = get_cost_warning_threshold(db).await?;

    let (status, paused_until) = if total_today >= daily_limit {
        pause_demo_until(db, day_end).await?;
        warn!(
            "Daily demo cost ${:.4} reached the ${:.2} limit; demo paused until {}",
            total_today, daily_limit, day_end
        );
        warn!(
            "Cost alert email (stub): daily limit exceeded, total ${:.4}",
            total_today
        );
        (CostStatus::Paused, Some(day_end))
    } else if total_today >= warning_threshold {
        info!(
            "Daily demo cost ${:.4} passed the ${:.2} warning threshold (limit ${:.2})",
            total_today, warning_threshold, daily_limit
        );
        (CostStatus::Warning, None)
    } else {
        (CostStatus::Ok, None)
    };

    Ok(CostReport {
        total_today,
        warning_threshold,
        daily_limit,
        status,
        paused_until,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::logs::record_attempt;
    use chrono::TimeZone;
    use parlo_common::db::init::{create_schema, init_default_settings};
    use parlo_common::db::settings::is_demo_paused;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        init_default_settings(&pool).await.unwrap();
        pool
    }

    async fn log_cost(db: &SqlitePool, cost: f64, at: DateTime<Utc>) {
        record_attempt(db, "a@b.com", "phrase", 80, cost, None, &[], at)
            .await
            .unwrap();
    }

    #[test]
    fn audio_size_drives_estimate() {
        // 480 KiB -> 60 s -> 1 min -> one per-minute unit
        let cost = estimate_attempt_cost(Some(480 * 1024), 0.001, 0.0005);
        assert!((cost - 0.001).abs() < 1e-9);

        // Half the audio, half the cost
        let cost = estimate_attempt_cost(Some(240 * 1024), 0.001, 0.0005);
        assert!((cost - 0.0005).abs() < 1e-9);
    }

    #[test]
    fn missing_audio_uses_flat_placeholder() {
        assert_eq!(estimate_attempt_cost(None, 0.001, 0.0005), 0.0005);
    }

    #[test]
    fn estimates_round_to_four_decimals() {
        let cost = estimate_attempt_cost(Some(1000), 0.123, 0.0005);
        assert_eq!(cost, (cost * 10_000.0).round() / 10_000.0);
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 5).unwrap();
        assert_eq!(start_of_utc_day(now), Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end_of_utc_day(now), Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn under_warning_is_ok_and_not_paused() {
        let db = setup_test_db().await;
        let now = Utc::now();
        log_cost(&db, 5.0, now).await;

        let report = run_cost_monitor(&db, now).await.unwrap();
        assert_eq!(report.status, CostStatus::Ok);
        assert!((report.total_today - 5.0).abs() < 1e-9);
        assert!(!is_demo_paused(&db, now).await.unwrap());
    }

    #[tokio::test]
    async fn warning_threshold_alerts_without_pausing() {
        let db = setup_test_db().await;
        let now = Utc::now();
        log_cost(&db, 21.0, now).await;

        let report = run_cost_monitor(&db, now).await.unwrap();
        assert_eq!(report.status, CostStatus::Warning);
        assert!(!is_demo_paused(&db, now).await.unwrap());
    }

    #[tokio::test]
    async fn hard_limit_pauses_until_end_of_day() {
        let db = setup_test_db().await;
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        log_cost(&db, 26.0, now).await;

        let report = run_cost_monitor(&db, now).await.unwrap();
        assert_eq!(report.status, CostStatus::Paused);
        assert_eq!(report.paused_until, Some(end_of_utc_day(now)));

        // Paused for the rest of the day, not the next morning
        assert!(is_demo_paused(&db, now).await.unwrap());
        let tomorrow = now + Duration::days(1);
        assert!(!is_demo_paused(&db, tomorrow).await.unwrap());
    }

    #[tokio::test]
    async fn yesterdays_spend_does_not_count_today() {
        let db = setup_test_db().await;
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap();
        log_cost(&db, 30.0, now - Duration::days(1)).await;

        let report = run_cost_monitor(&db, now).await.unwrap();
        assert_eq!(report.status, CostStatus::Ok);
        assert_eq!(report.total_today, 0.0);
    }
}
