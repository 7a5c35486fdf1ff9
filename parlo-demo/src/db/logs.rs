//! Pronunciation attempt log persistence and cost aggregation
//!
//! `pronunciation_logs` is append-only. `created_at` is always bound
//! explicitly (RFC 3339, UTC) rather than left to CURRENT_TIMESTAMP, so the
//! range comparisons in the aggregation queries compare like with like.

use chrono::{DateTime, Utc};
use parlo_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Aggregated usage for a time window
#[derive(Debug, Clone)]
pub struct UsageStats {
    pub distinct_users: i64,
    pub attempt_count: i64,
    pub total_cost: f64,
}

impl UsageStats {
    /// Average estimated cost per distinct user; zero when nobody attempted
    pub fn avg_cost_per_user(&self) -> f64 {
        if self.distinct_users == 0 {
            0.0
        } else {
            self.total_cost / self.distinct_users as f64
        }
    }
}

/// Per-user cost total within a time window
#[derive(Debug, Clone)]
pub struct UserCost {
    pub email: String,
    pub total_cost: f64,
}

/// Append one scoring attempt to the log
#[allow(clippy::too_many_arguments)]
pub async fn record_attempt(
    db: &SqlitePool,
    email: &str,
    phrase: &str,
    score: i64,
    estimated_cost: f64,
    client_ip: Option<&str>,
    feedback: &[String],
    created_at: DateTime<Utc>,
) -> Result<()> {
    let feedback_json = serde_json::to_string(feedback)
        .map_err(|e| parlo_common::Error::Internal(format!("Failed to encode feedback: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO pronunciation_logs
            (guid, email, phrase, score, estimated_cost, client_ip, feedback, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(phrase)
    .bind(score)
    .bind(estimated_cost)
    .bind(client_ip)
    .bind(feedback_json)
    .bind(created_at)
    .execute(db)
    .await?;

    Ok(())
}

/// Sum estimated cost over a half-open window [start, end)
pub async fn cost_in_window(
    db: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<f64> {
    let total: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(estimated_cost), 0.0)
        FROM pronunciation_logs
        WHERE created_at >= ? AND created_at < ?
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await?;

    Ok(total)
}

/// Usage stats over a half-open window [start, end)
pub async fn usage_stats(
    db: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<UsageStats> {
    let (distinct_users, attempt_count, total_cost): (i64, i64, f64) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT email), COUNT(*), COALESCE(SUM(estimated_cost), 0.0)
        FROM pronunciation_logs
        WHERE created_at >= ? AND created_at < ?
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await?;

    Ok(UsageStats {
        distinct_users,
        attempt_count,
        total_cost,
    })
}

/// Heaviest spenders in a window, highest total first
pub async fn top_user_costs(
    db: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<UserCost>> {
    let rows: Vec<(String, f64)> = sqlx::query_as(
        r#"
        SELECT email, SUM(estimated_cost) AS total_cost
        FROM pronunciation_logs
        WHERE created_at >= ? AND created_at < ?
        GROUP BY email
        ORDER BY total_cost DESC
        LIMIT ?
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(email, total_cost)| UserCost { email, total_cost })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parlo_common::db::init::create_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    async fn log(db: &SqlitePool, email: &str, cost: f64, at: DateTime<Utc>) {
        record_attempt(db, email, "test phrase", 80, cost, Some("10.0.0.1"), &[], at)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn window_sum_excludes_outside_rows() {
        let db = setup_test_db().await;
        let start = Utc::now();
        let end = start + Duration::days(1);

        log(&db, "a@b.com", 1.0, start).await;
        log(&db, "a@b.com", 2.0, start + Duration::hours(10)).await;
        log(&db, "a@b.com", 100.0, start - Duration::hours(1)).await;
        log(&db, "a@b.com", 100.0, end).await;

        let total = cost_in_window(&db, start, end).await.unwrap();
        assert!((total - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_window_sums_to_zero() {
        let db = setup_test_db().await;
        let start = Utc::now();
        let total = cost_in_window(&db, start, start + Duration::days(1)).await.unwrap();
        assert_eq!(total, 0.0);
    }

    #[tokio::test]
    async fn usage_stats_aggregate_per_window() {
        let db = setup_test_db().await;
        let start = Utc::now();
        let end = start + Duration::days(1);

        log(&db, "a@b.com", 1.0, start).await;
        log(&db, "a@b.com", 1.0, start + Duration::hours(1)).await;
        log(&db, "c@d.com", 4.0, start + Duration::hours(2)).await;

        let stats = usage_stats(&db, start, end).await.unwrap();
        assert_eq!(stats.distinct_users, 2);
        assert_eq!(stats.attempt_count, 3);
        assert!((stats.total_cost - 6.0).abs() < 1e-9);
        assert!((stats.avg_cost_per_user() - 3.0).abs() < 1e-9);

        let empty = usage_stats(&db, end, end + Duration::days(1)).await.unwrap();
        assert_eq!(empty.distinct_users, 0);
        assert_eq!(empty.avg_cost_per_user(), 0.0);
    }

    #[tokio::test]
    async fn top_users_ordered_by_spend() {
        let db = setup_test_db().await;
        let start = Utc::now();
        let end = start + Duration::days(1);

        log(&db, "small@b.com", 1.0, start).await;
        log(&db, "big@b.com", 5.0, start).await;
        log(&db, "big@b.com", 5.0, start + Duration::hours(1)).await;

        let top = top_user_costs(&db, start, end, 5).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].email, "big@b.com");
        assert!((top[0].total_cost - 10.0).abs() < 1e-9);
        assert_eq!(top[1].email, "small@b.com");
    }

    #[tokio::test]
    async fn feedback_is_stored_as_json() {
        let db = setup_test_db().await;
        let now = Utc::now();
        record_attempt(
            &db,
            "a@b.com",
            "hello",
            70,
            0.001,
            None,
            &["Good job!".to_string()],
            now,
        )
        .await
        .unwrap();

        let stored: String =
            sqlx::query_scalar("SELECT feedback FROM pronunciation_logs WHERE email = 'a@b.com'")
                .fetch_one(&db)
                .await
                .unwrap();
        let parsed: Vec<String> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed, vec!["Good job!".to_string()]);
    }
}
