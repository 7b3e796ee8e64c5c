use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::password_recovery::PasswordRecovery;
use crate::utils::codes::hash_code;

/// Stores a freshly issued recovery code (hashed). Callers are expected to
/// supersede outstanding codes first so only one code is live per user.
pub async fn create_recovery(
    pool: &PgPool,
    user_id: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordRecovery, sqlx::Error> {
    let code_hash = hash_code(code);
    let recovery_id = Uuid::new_v4().to_string();

    sqlx::query_as::<_, PasswordRecovery>(
        r#"
        INSERT INTO password_recoveries (id, user_id, code_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, code_hash, expires_at, created_at, used_at
        "#,
    )
    .bind(&recovery_id)
    .bind(user_id)
    .bind(&code_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Marks every outstanding code of the user as consumed. Issuing a new code
/// always invalidates the prior one.
pub async fn supersede_outstanding(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE password_recoveries SET used_at = $1 WHERE user_id = $2 AND used_at IS NULL",
    )
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// One atomic "find unconsumed, unexpired, matching" check. Expired and
/// consumed codes are indistinguishable from missing ones.
pub async fn find_valid_recovery_by_code(
    pool: &PgPool,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<PasswordRecovery>, sqlx::Error> {
    let code_hash = hash_code(code);

    sqlx::query_as::<_, PasswordRecovery>(
        r#"
        SELECT id, user_id, code_hash, expires_at, created_at, used_at
        FROM password_recoveries
        WHERE code_hash = $1
        AND expires_at > $2
        AND used_at IS NULL
        "#,
    )
    .bind(&code_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Consumes the code exactly once; the `used_at IS NULL` condition loses
/// the race for every caller but the first.
pub async fn mark_code_as_used(
    pool: &PgPool,
    recovery_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE password_recoveries SET used_at = $1 WHERE id = $2 AND used_at IS NULL",
    )
    .bind(now)
    .bind(recovery_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_expired_codes(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM password_recoveries WHERE expires_at < NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
