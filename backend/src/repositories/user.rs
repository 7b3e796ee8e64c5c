use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::user::User;

const USER_COLUMNS: &str = "id, login, email, password_hash, is_confirmed, confirmation_code, \
     confirmation_expires_at, is_banned, created_at, updated_at";

/// Finds a user by their login.
pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
    ))
    .bind(login)
    .fetch_optional(pool)
    .await
}

/// Finds a user by their email address.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Finds a user by their ID.
pub async fn find_user_by_id(pool: &PgPool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Finds the user holding a pending confirmation code.
pub async fn find_user_by_confirmation_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE confirmation_code = $1"
    ))
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// Inserts a freshly registered user.
pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, login, email, password_hash, is_confirmed, confirmation_code, \
         confirmation_expires_at, is_banned, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&user.id)
    .bind(&user.login)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.is_confirmed)
    .bind(&user.confirmation_code)
    .bind(user.confirmation_expires_at)
    .bind(user.is_banned)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Flips the confirmation flag exactly once; the conditional WHERE makes a
/// repeated confirmation a no-op rather than a second success.
pub async fn set_confirmed(pool: &PgPool, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET is_confirmed = TRUE, confirmation_code = NULL, \
         confirmation_expires_at = NULL, updated_at = NOW() \
         WHERE id = $1 AND is_confirmed = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Replaces the pending confirmation code, superseding any prior one.
/// Confirmed accounts are left untouched.
pub async fn set_confirmation_code(
    pool: &PgPool,
    user_id: &str,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET confirmation_code = $1, confirmation_expires_at = $2, updated_at = NOW() \
         WHERE id = $3 AND is_confirmed = FALSE",
    )
    .bind(code)
    .bind(expires_at)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrites the stored password hash.
pub async fn update_password_hash(
    pool: &PgPool,
    user_id: &str,
    new_password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(new_password_hash)
        .bind(user_id)
        .execute(pool)
        .await
        .map(|_| ())
}
