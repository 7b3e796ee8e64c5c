use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::rate_limit::LimitAttempt;

/// Counts attempts for the (ip, login, endpoint) key inside the trailing
/// window. The log is append-only; eventual-consistency races between count
/// and record are tolerated.
pub async fn count_attempts_since(
    pool: &PgPool,
    ip: &str,
    login: &str,
    endpoint: &str,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM limit_attempts \
         WHERE ip = $1 AND login = $2 AND endpoint = $3 AND attempted_at >= $4",
    )
    .bind(ip)
    .bind(login)
    .bind(endpoint)
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Records an attempt unconditionally; denied attempts still count toward
/// future windows.
pub async fn record_attempt(pool: &PgPool, attempt: &LimitAttempt) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO limit_attempts (ip, login, endpoint, attempted_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&attempt.ip)
    .bind(&attempt.login)
    .bind(&attempt.endpoint)
    .bind(attempt.attempted_at)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Drops attempts that have aged out of every possible window.
pub async fn cleanup_attempts_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM limit_attempts WHERE attempted_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
