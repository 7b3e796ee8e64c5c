use axum::{
    extract::{Extension, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::time::Duration;
use validator::Validate;

use crate::{
    error::AppError,
    middleware::rate_limit::{LimitKey, RateLimiter},
    models::user::{
        ConfirmationCodePayload, CreateUserRequest, EmailPayload, LoginRequest, LoginResponse,
        MeResponse, NewPasswordPayload, User,
    },
    services::auth::{AuthService, IssuedTokens},
    state::AppState,
    utils::{
        cookies::{
            build_clear_refresh_cookie, build_refresh_cookie, extract_cookie_value, CookieOptions,
            REFRESH_COOKIE_NAME,
        },
        http::{client_ip, user_agent},
    },
};

/// POST /api/auth/login. Rate limited on (ip, login) before the password is
/// even looked at; the refresh token leaves only as an httpOnly cookie.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let ip = client_ip(&headers);
    enforce_rate_limit(
        &state,
        &LimitKey {
            ip: &ip,
            login: &payload.login,
            endpoint: "/api/auth/login",
        },
    )
    .await?;

    let tokens = AuthService::from_state(&state)
        .login(
            &payload.login,
            &payload.password,
            &ip,
            user_agent(&headers).as_deref(),
        )
        .await?;

    token_response(&state, tokens)
}

/// POST /api/auth/refresh-token. Exchanges the cookie-borne refresh token
/// for a fresh pair; replays fail 401, dead sessions 403.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let raw_token = refresh_cookie(&headers)?;
    let ip = client_ip(&headers);

    let tokens = AuthService::from_state(&state)
        .refresh(&raw_token, &ip, user_agent(&headers).as_deref())
        .await?;

    token_response(&state, tokens)
}

/// POST /api/auth/logout.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let raw_token = refresh_cookie(&headers)?;

    AuthService::from_state(&state)
        .logout(&raw_token, user_agent(&headers).as_deref())
        .await?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        header_value(build_clear_refresh_cookie(cookie_options(&state)))?,
    );
    Ok(response)
}

/// POST /api/auth/registration. The ip-keyed rate limit runs as a layer in
/// front of this handler.
pub async fn registration(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    AuthService::from_state(&state).register(payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/registration-confirmation.
pub async fn registration_confirmation(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmationCodePayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let confirmed = AuthService::from_state(&state)
        .confirm_account(&payload.code)
        .await?;
    if !confirmed {
        return Err(AppError::BadRequest(
            "Confirmation code is incorrect or expired".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/registration-email-resending.
pub async fn registration_email_resending(
    State(state): State<AppState>,
    Json(payload): Json<EmailPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let resent = AuthService::from_state(&state)
        .resend_confirmation_code(&payload.email)
        .await?;
    if !resent {
        return Err(AppError::BadRequest(
            "Email is already confirmed".to_string(),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/password-recovery. Always 204 so the endpoint cannot be
/// used to probe which emails exist.
pub async fn password_recovery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<EmailPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let ip = client_ip(&headers);
    enforce_rate_limit(
        &state,
        &LimitKey {
            ip: &ip,
            login: &payload.email,
            endpoint: "/api/auth/password-recovery",
        },
    )
    .await?;

    AuthService::from_state(&state)
        .send_recovery_code(&payload.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/new-password.
pub async fn new_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewPasswordPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;

    let ip = client_ip(&headers);
    enforce_rate_limit(
        &state,
        &LimitKey {
            ip: &ip,
            login: "",
            endpoint: "/api/auth/new-password",
        },
    )
    .await?;

    AuthService::from_state(&state)
        .confirm_password_recovery(&payload.recovery_code, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me; the auth middleware has already resolved the user.
pub async fn me(Extension(user): Extension<User>) -> Result<Json<MeResponse>, AppError> {
    Ok(Json(user.into()))
}

async fn enforce_rate_limit(state: &AppState, key: &LimitKey<'_>) -> Result<(), AppError> {
    let limiter = RateLimiter::new(state.pool.clone(), &state.config);
    if !limiter.check(key, Utc::now()).await? {
        tracing::warn!(ip = key.ip, endpoint = key.endpoint, "Rate limit exceeded");
        return Err(AppError::TooManyRequests {
            retry_after: limiter.retry_after_seconds(),
        });
    }
    Ok(())
}

fn token_response(state: &AppState, tokens: IssuedTokens) -> Result<Response, AppError> {
    let max_age = Duration::from_secs(state.config.refresh_token_expiration_days * 24 * 60 * 60);
    let cookie = build_refresh_cookie(&tokens.refresh_token, max_age, cookie_options(state));

    let mut response = Json(LoginResponse {
        access_token: tokens.access_token,
    })
    .into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, header_value(cookie)?);
    Ok(response)
}

fn refresh_cookie(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, REFRESH_COOKIE_NAME))
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))
}

fn cookie_options(state: &AppState) -> CookieOptions {
    CookieOptions {
        secure: state.config.cookie_secure,
        same_site: state.config.cookie_same_site,
    }
}

fn header_value(value: String) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&value)
        .map_err(|err| AppError::InternalServerError(anyhow::anyhow!("Invalid header: {err}")))
}
