use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::device_session::DeviceSession;

/// Records the session created alongside a refresh token. A device that
/// already has a session gets it overwritten; there is never more than one
/// live session per device.
pub async fn upsert_session(pool: &PgPool, session: &DeviceSession) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO device_sessions (device_id, user_id, device_name, ip, issued_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (device_id)
        DO UPDATE SET user_id = EXCLUDED.user_id,
                      device_name = EXCLUDED.device_name,
                      ip = EXCLUDED.ip,
                      issued_at = EXCLUDED.issued_at,
                      expires_at = EXCLUDED.expires_at
        "#,
    )
    .bind(&session.device_id)
    .bind(&session.user_id)
    .bind(&session.device_name)
    .bind(&session.ip)
    .bind(session.issued_at)
    .bind(session.expires_at)
    .execute(pool)
    .await
    .map(|_| ())
}

/// The source of truth for "is this refresh token still valid": the session
/// must exist for (user, device), carry the token's issuance instant, and be
/// unexpired. Anything else reads as absent.
pub async fn find_live_session(
    pool: &PgPool,
    user_id: &str,
    device_id: &str,
    issued_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Option<DeviceSession>, sqlx::Error> {
    sqlx::query_as::<_, DeviceSession>(
        r#"
        SELECT device_id, user_id, device_name, ip, issued_at, expires_at
        FROM device_sessions
        WHERE user_id = $1 AND device_id = $2 AND issued_at = $3 AND expires_at > $4
        "#,
    )
    .bind(user_id)
    .bind(device_id)
    .bind(issued_at)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Fetches a session regardless of owner or expiry, for ownership checks
/// before a targeted termination.
pub async fn find_session_by_device(
    pool: &PgPool,
    device_id: &str,
) -> Result<Option<DeviceSession>, sqlx::Error> {
    sqlx::query_as::<_, DeviceSession>(
        r#"
        SELECT device_id, user_id, device_name, ip, issued_at, expires_at
        FROM device_sessions
        WHERE device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await
}

/// Moves the session window forward after a successful rotation. Plain
/// last-writer-wins: only one caller can win the revocation race for the
/// token that led here.
pub async fn replace_session_window(
    pool: &PgPool,
    device_id: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    ip: &str,
    device_name: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE device_sessions
        SET issued_at = $1, expires_at = $2, ip = $3, device_name = $4
        WHERE device_id = $5
        "#,
    )
    .bind(issued_at)
    .bind(expires_at)
    .bind(ip)
    .bind(device_name)
    .bind(device_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_session(pool: &PgPool, device_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM device_sessions WHERE device_id = $1")
        .bind(device_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_live_sessions_for_user(
    pool: &PgPool,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<DeviceSession>, sqlx::Error> {
    sqlx::query_as::<_, DeviceSession>(
        r#"
        SELECT device_id, user_id, device_name, ip, issued_at, expires_at
        FROM device_sessions
        WHERE user_id = $1 AND expires_at > $2
        ORDER BY issued_at DESC, device_id DESC
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Terminates every session of the user except the calling device's.
pub async fn remove_other_sessions(
    pool: &PgPool,
    user_id: &str,
    keep_device_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM device_sessions WHERE user_id = $1 AND device_id <> $2")
        .bind(user_id)
        .bind(keep_device_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_sessions_for_user(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM device_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map(|_| ())
}

pub async fn cleanup_expired_sessions(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM device_sessions WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
