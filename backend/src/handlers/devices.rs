//! Device-session management. These endpoints authenticate with the refresh
//! cookie, like the rotation endpoints, because they act on refresh state.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::device_session::DeviceSessionResponse,
    repositories::device_session as session_repo,
    state::AppState,
    utils::{
        cookies::{extract_cookie_value, REFRESH_COOKIE_NAME},
        jwt::{verify_refresh_token, RefreshClaims},
    },
};

/// GET /api/security/devices — all live sessions of the calling user.
pub async fn list_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DeviceSessionResponse>>, AppError> {
    let claims = authenticate_refresh(&state, &headers).await?;

    let sessions =
        session_repo::list_live_sessions_for_user(&state.pool, &claims.sub, Utc::now()).await?;
    Ok(Json(
        sessions
            .into_iter()
            .map(DeviceSessionResponse::from)
            .collect(),
    ))
}

/// DELETE /api/security/devices — terminate every session except the
/// calling device's.
pub async fn terminate_other_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let claims = authenticate_refresh(&state, &headers).await?;

    let removed =
        session_repo::remove_other_sessions(&state.pool, &claims.sub, &claims.device_id).await?;
    tracing::debug!(user_id = %claims.sub, removed, "Terminated other device sessions");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/security/devices/{device_id} — terminate one session. 404
/// for an unknown device, 403 when it belongs to someone else.
pub async fn terminate_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let claims = authenticate_refresh(&state, &headers).await?;

    let session = session_repo::find_session_by_device(&state.pool, &device_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Device session not found".to_string()))?;
    if session.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "Cannot terminate another user's session".to_string(),
        ));
    }

    session_repo::remove_session(&state.pool, &device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Verifies the refresh cookie and confirms its session is still the live
/// one for the device; anything else reads as unauthenticated.
async fn authenticate_refresh(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<RefreshClaims, AppError> {
    let raw_token = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| extract_cookie_value(raw, REFRESH_COOKIE_NAME))
        .ok_or_else(unauthorized)?;

    let claims = verify_refresh_token(&raw_token, &state.config.refresh_token_secret)
        .map_err(|_| unauthorized())?;

    let issued_at = DateTime::<Utc>::from_timestamp(claims.iat, 0).ok_or_else(unauthorized)?;
    session_repo::find_live_session(
        &state.pool,
        &claims.sub,
        &claims.device_id,
        issued_at,
        Utc::now(),
    )
    .await?
    .ok_or_else(unauthorized)?;

    Ok(claims)
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Missing or invalid refresh token".to_string())
}
