use bloggers_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{
        device_session, password_recovery as recovery_repo, rate_limit as rate_limit_repo,
        revoked_token as revoked_repo,
    },
};
use chrono::{Duration, Utc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let deleted_sessions = device_session::cleanup_expired_sessions(&pool).await?;
    if deleted_sessions > 0 {
        tracing::info!("Deleted {} expired device sessions", deleted_sessions);
    }

    let deleted_revocations = revoked_repo::cleanup_expired(&pool).await?;
    if deleted_revocations > 0 {
        tracing::info!(
            "Deleted {} revocation records past token expiry",
            deleted_revocations
        );
    }

    let deleted_codes = recovery_repo::delete_expired_codes(&pool).await?;
    if deleted_codes > 0 {
        tracing::info!("Deleted {} expired recovery codes", deleted_codes);
    }

    // Attempts older than the window can no longer influence any decision.
    let cutoff = Utc::now() - Duration::seconds(config.rate_limit_window_seconds as i64);
    let deleted_attempts = rate_limit_repo::cleanup_attempts_before(&pool, cutoff).await?;
    if deleted_attempts > 0 {
        tracing::info!("Deleted {} aged-out limit attempts", deleted_attempts);
    }

    for table in [
        "device_sessions",
        "revoked_tokens",
        "password_recoveries",
        "limit_attempts",
    ] {
        sqlx::query(&format!("VACUUM (ANALYZE) {table}"))
            .execute(&pool)
            .await?;
    }

    Ok(())
}
