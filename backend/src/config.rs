use serde::{Deserialize, Serialize};
use std::env;

use crate::utils::cookies::SameSite;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiration_minutes: u64,
    pub refresh_token_expiration_days: u64,
    pub confirmation_code_expiration_hours: u64,
    pub recovery_code_expiration_hours: u64,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_attempts: u32,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/bloggers".to_string());

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .unwrap_or_else(|_| "access-secret-change-this-in-production".to_string());

        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .unwrap_or_else(|_| "refresh-secret-change-this-in-production".to_string());

        let access_token_expiration_minutes = env::var("ACCESS_TOKEN_EXPIRATION_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let refresh_token_expiration_days = env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);

        let confirmation_code_expiration_hours = env::var("CONFIRMATION_CODE_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let recovery_code_expiration_hours = env::var("RECOVERY_CODE_EXPIRATION_HOURS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .unwrap_or(1);

        let rate_limit_window_seconds = env::var("RATE_LIMIT_WINDOW_SECONDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let rate_limit_max_attempts = env::var("RATE_LIMIT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|value| value != "false")
            .unwrap_or(true);

        let cookie_same_site = match env::var("COOKIE_SAME_SITE").as_deref() {
            Ok("strict") => SameSite::Strict,
            Ok("none") => SameSite::None,
            _ => SameSite::Lax,
        };

        Ok(Config {
            database_url,
            access_token_secret,
            refresh_token_secret,
            access_token_expiration_minutes,
            refresh_token_expiration_days,
            confirmation_code_expiration_hours,
            recovery_code_expiration_hours,
            rate_limit_window_seconds,
            rate_limit_max_attempts,
            cookie_secure,
            cookie_same_site,
        })
    }
}
