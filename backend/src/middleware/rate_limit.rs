//! Store-backed sliding-window rate limiting.
//!
//! Attempts are counted over a trailing window with a plain range query and
//! recorded unconditionally, so denied attempts still count toward future
//! windows. This is a fixed-window-by-query counter, not a token bucket;
//! the burst-at-boundary imprecision is an accepted tradeoff.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::{
    config::Config, error::AppError, models::rate_limit::LimitAttempt,
    repositories::rate_limit as rate_limit_repo, state::AppState, utils::http::client_ip,
};

#[derive(Debug, Clone)]
pub struct LimitKey<'a> {
    pub ip: &'a str,
    /// Login or email component; empty for ip-only keys.
    pub login: &'a str,
    pub endpoint: &'a str,
}

pub struct RateLimiter {
    pool: PgPool,
    window: Duration,
    max_attempts: u32,
}

impl RateLimiter {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            pool,
            window: Duration::seconds(config.rate_limit_window_seconds.max(1) as i64),
            max_attempts: config.rate_limit_max_attempts.max(1),
        }
    }

    /// Counts attempts in the trailing window, records the current one, and
    /// reports whether the request may proceed.
    pub async fn check(&self, key: &LimitKey<'_>, now: DateTime<Utc>) -> Result<bool, AppError> {
        let since = now - self.window;
        let attempts_so_far = rate_limit_repo::count_attempts_since(
            &self.pool,
            key.ip,
            key.login,
            key.endpoint,
            since,
        )
        .await?;

        let attempt = LimitAttempt {
            ip: key.ip.to_string(),
            login: key.login.to_string(),
            endpoint: key.endpoint.to_string(),
            attempted_at: now,
        };
        rate_limit_repo::record_attempt(&self.pool, &attempt).await?;

        Ok(attempts_so_far < i64::from(self.max_attempts))
    }

    pub fn retry_after_seconds(&self) -> u64 {
        self.window.num_seconds().max(1) as u64
    }
}

/// IP-keyed gate for the registration endpoints. The login-sensitive
/// endpoints (login, password recovery) run the composite check inside
/// their handlers instead, before any credential work.
pub async fn rate_limit_by_ip(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(request.headers());
    let endpoint = request.uri().path().to_string();

    let limiter = RateLimiter::new(state.pool.clone(), &state.config);
    let key = LimitKey {
        ip: &ip,
        login: "",
        endpoint: &endpoint,
    };
    if !limiter.check(&key, Utc::now()).await? {
        tracing::warn!(ip = %ip, endpoint = %endpoint, "Rate limit exceeded");
        return Err(AppError::TooManyRequests {
            retry_after: limiter.retry_after_seconds(),
        });
    }

    Ok(next.run(request).await)
}
