//! Lead capture persistence
//!
//! One row per email in `demo_leads`; re-submission overwrites prior
//! name/score/source.

use parlo_common::db::models::{DemoLead, LeadSource};
use parlo_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Upsert a lead keyed by email
pub async fn upsert_lead(
    db: &SqlitePool,
    email: &str,
    first_name: Option<&str>,
    source: LeadSource,
    demo_score: Option<f64>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO demo_leads (guid, email, first_name, source, demo_score)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            first_name = excluded.first_name,
            source = excluded.source,
            demo_score = excluded.demo_score,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(first_name)
    .bind(source.as_str())
    .bind(demo_score)
    .execute(db)
    .await?;

    Ok(())
}

/// Look up a lead by email
pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<DemoLead>> {
    let row: Option<(String, String, Option<String>, String, Option<f64>)> = sqlx::query_as(
        "SELECT guid, email, first_name, source, demo_score FROM demo_leads WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    match row {
        Some((guid, email, first_name, source, demo_score)) => {
            let source = LeadSource::parse(&source).ok_or_else(|| {
                parlo_common::Error::Internal(format!("Unknown lead source: {}", source))
            })?;
            Ok(Some(DemoLead {
                guid,
                email,
                first_name,
                source,
                demo_score,
            }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[tokio::test]
    async fn upsert_creates_then_overwrites() {
        let db = setup_test_db().await;

        upsert_lead(&db, "a@b.com", Some("Ana"), LeadSource::EmailCapture, None)
            .await
            .unwrap();
        let lead = find_by_email(&db, "a@b.com").await.unwrap().unwrap();
        assert_eq!(lead.first_name.as_deref(), Some("Ana"));
        assert_eq!(lead.source, LeadSource::EmailCapture);
        assert_eq!(lead.demo_score, None);

        upsert_lead(&db, "a@b.com", Some("Anabel"), LeadSource::DemoComplete, Some(82.0))
            .await
            .unwrap();
        let lead = find_by_email(&db, "a@b.com").await.unwrap().unwrap();
        assert_eq!(lead.first_name.as_deref(), Some("Anabel"));
        assert_eq!(lead.source, LeadSource::DemoComplete);
        assert_eq!(lead.demo_score, Some(82.0));

        // Only one row despite two submissions
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM demo_leads")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn missing_lead_is_none() {
        let db = setup_test_db().await;
        assert!(find_by_email(&db, "ghost@b.com").await.unwrap().is_none());
    }
}
