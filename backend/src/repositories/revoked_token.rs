use sqlx::PgPool;

use crate::models::revoked_token::RevokedToken;

/// Marks a refresh token as spent. The primary key on `token_hash` makes
/// this the compare-and-set that serializes concurrent refresh calls:
/// `true` means this caller inserted the row and may proceed with rotation;
/// `false` means the token was already consumed and the call must be
/// rejected as a replay.
pub async fn revoke(pool: &PgPool, token: &RevokedToken) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO revoked_tokens (token_hash, user_id, user_agent, expires_at, revoked_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (token_hash) DO NOTHING",
    )
    .bind(&token.token_hash)
    .bind(&token.user_id)
    .bind(&token.user_agent)
    .bind(token.expires_at)
    .bind(token.revoked_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_revoked(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token_hash = $1)",
    )
    .bind(token_hash)
    .fetch_one(pool)
    .await
}

/// Rows whose token has expired on its own can no longer be replayed and
/// are safe to drop.
pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
