//! Access grant persistence
//!
//! One row per email in `demo_access`. Issue is a single conditional upsert
//! so concurrent requests for the same email cannot mint duplicate tokens;
//! attempt consumption is a single decrement-if-positive UPDATE so
//! `attempts_remaining` can never go negative.

use chrono::{DateTime, Duration, Utc};
use parlo_common::db::models::AccessGrant;
use parlo_common::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Length of generated access tokens
const TOKEN_CHARS: usize = 32;

/// Generate a random alphanumeric access token
pub fn generate_token(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(TOKEN_CHARS)
        .map(char::from)
        .collect()
}

/// Issue a grant for an email, reusing a still-usable existing grant
///
/// Returns the grant and whether it was restored (true) or freshly issued
/// (false). The upsert only overwrites an existing row when that row is
/// exhausted or expired, so the find-or-create-with-reset is one statement.
pub async fn issue_grant(
    db: &SqlitePool,
    email: &str,
    max_attempts: i64,
    session_hours: i64,
    now: DateTime<Utc>,
) -> Result<(AccessGrant, bool)> {
    let token = generate_token(&mut rand::thread_rng());
    let expires_at = now + Duration::hours(session_hours);

    sqlx::query(
        r#"
        INSERT INTO demo_access (guid, email, access_token, attempts_remaining, expires_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            access_token = excluded.access_token,
            attempts_remaining = excluded.attempts_remaining,
            expires_at = excluded.expires_at,
            pre_ordered = 0,
            accumulated_cost = 0,
            updated_at = CURRENT_TIMESTAMP
        WHERE demo_access.attempts_remaining <= 0 OR demo_access.expires_at <= ?
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(&token)
    .bind(max_attempts)
    .bind(expires_at)
    .bind(now)
    .execute(db)
    .await?;

    let grant = find_by_email(db, email)
        .await?
        .ok_or_else(|| parlo_common::Error::Internal(format!("Grant upsert lost for {}", email)))?;

    let restored = grant.access_token != token;
    Ok((grant, restored))
}

/// Look up a grant by email
pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<AccessGrant>> {
    let grant = sqlx::query_as::<_, AccessGrant>(
        r#"
        SELECT guid, email, access_token, attempts_remaining, expires_at,
               pre_ordered, accumulated_cost
        FROM demo_access
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(grant)
}

/// Look up a grant by access token
pub async fn find_by_token(db: &SqlitePool, token: &str) -> Result<Option<AccessGrant>> {
    let grant = sqlx::query_as::<_, AccessGrant>(
        r#"
        SELECT guid, email, access_token, attempts_remaining, expires_at,
               pre_ordered, accumulated_cost
        FROM demo_access
        WHERE access_token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    Ok(grant)
}

/// Consume one attempt and add the estimated cost to the grant's total
///
/// Atomic decrement-if-positive: returns the new `attempts_remaining` when
/// an attempt was consumed, or None when the grant was already exhausted,
/// expired, or unknown (callers map None to a rate-limit rejection).
pub async fn consume_attempt(
    db: &SqlitePool,
    token: &str,
    cost: f64,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE demo_access
        SET attempts_remaining = attempts_remaining - 1,
            accumulated_cost = accumulated_cost + ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE access_token = ? AND attempts_remaining > 0 AND expires_at > ?
        RETURNING attempts_remaining
        "#,
    )
    .bind(cost)
    .bind(token)
    .bind(now)
    .fetch_optional(db)
    .await?;

    Ok(remaining)
}

/// Mark a grant as pre-ordered; returns false when the token is unknown
pub async fn mark_pre_ordered(db: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE demo_access SET pre_ordered = 1, updated_at = CURRENT_TIMESTAMP WHERE access_token = ?",
    )
    .bind(token)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlo_common::db::init::create_schema;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
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

    #[test]
    fn tokens_are_32_alphanumeric_chars() {
        let mut rng = StdRng::seed_from_u64(1);
        let token = generate_token(&mut rng);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        let other = generate_token(&mut rng);
        assert_ne!(token, other);
    }

    #[tokio::test]
    async fn issue_then_reissue_returns_same_token() {
        let db = setup_test_db().await;
        let now = Utc::now();

        let (first, restored) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        assert!(!restored);
        assert_eq!(first.attempts_remaining, 5);

        let (second, restored) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        assert!(restored);
        assert_eq!(second.access_token, first.access_token);
    }

    #[tokio::test]
    async fn reissue_does_not_reset_remaining_attempts() {
        let db = setup_test_db().await;
        let now = Utc::now();

        let (grant, _) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        consume_attempt(&db, &grant.access_token, 0.001, now).await.unwrap();

        let (again, restored) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        assert!(restored);
        assert_eq!(again.attempts_remaining, 4);
    }

    #[tokio::test]
    async fn expired_grant_gets_fresh_token_and_attempts() {
        let db = setup_test_db().await;
        let past = Utc::now() - Duration::hours(48);

        let (old, _) = issue_grant(&db, "a@b.com", 5, 24, past).await.unwrap();

        let (fresh, restored) = issue_grant(&db, "a@b.com", 5, 24, Utc::now()).await.unwrap();
        assert!(!restored);
        assert_ne!(fresh.access_token, old.access_token);
        assert_eq!(fresh.attempts_remaining, 5);
        assert!(!fresh.pre_ordered);
        assert_eq!(fresh.accumulated_cost, 0.0);
    }

    #[tokio::test]
    async fn exhausted_grant_gets_fresh_token() {
        let db = setup_test_db().await;
        let now = Utc::now();

        let (grant, _) = issue_grant(&db, "a@b.com", 1, 24, now).await.unwrap();
        let remaining = consume_attempt(&db, &grant.access_token, 0.001, now).await.unwrap();
        assert_eq!(remaining, Some(0));

        let (fresh, restored) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        assert!(!restored);
        assert_ne!(fresh.access_token, grant.access_token);
        assert_eq!(fresh.attempts_remaining, 5);
    }

    #[tokio::test]
    async fn consume_stops_at_zero() {
        let db = setup_test_db().await;
        let now = Utc::now();

        let (grant, _) = issue_grant(&db, "a@b.com", 2, 24, now).await.unwrap();
        assert_eq!(consume_attempt(&db, &grant.access_token, 0.1, now).await.unwrap(), Some(1));
        assert_eq!(consume_attempt(&db, &grant.access_token, 0.1, now).await.unwrap(), Some(0));
        assert_eq!(consume_attempt(&db, &grant.access_token, 0.1, now).await.unwrap(), None);

        let grant = find_by_token(&db, &grant.access_token).await.unwrap().unwrap();
        assert_eq!(grant.attempts_remaining, 0);
        assert!((grant.accumulated_cost - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn consume_rejects_expired_grant_with_attempts_left() {
        let db = setup_test_db().await;
        let past = Utc::now() - Duration::hours(48);

        let (grant, _) = issue_grant(&db, "a@b.com", 5, 24, past).await.unwrap();
        let result = consume_attempt(&db, &grant.access_token, 0.1, Utc::now()).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn consume_rejects_unknown_token() {
        let db = setup_test_db().await;
        let result = consume_attempt(&db, "nope", 0.1, Utc::now()).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn pre_order_marks_grant() {
        let db = setup_test_db().await;
        let now = Utc::now();

        let (grant, _) = issue_grant(&db, "a@b.com", 5, 24, now).await.unwrap();
        assert!(!grant.pre_ordered);

        assert!(mark_pre_ordered(&db, &grant.access_token).await.unwrap());
        let grant = find_by_token(&db, &grant.access_token).await.unwrap().unwrap();
        assert!(grant.pre_ordered);

        assert!(!mark_pre_ordered(&db, "nope").await.unwrap());
    }
}
