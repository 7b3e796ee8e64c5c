use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError, repositories::user as user_repo, state::AppState,
    utils::jwt::verify_access_token,
};

/// Bearer access-token guard. A structurally invalid token is rejected
/// before any lookup runs.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(|value| value.to_string())
        .ok_or_else(unauthorized)?;

    let claims = verify_access_token(&token, &state.config.access_token_secret)
        .map_err(|_| unauthorized())?;

    let user = user_repo::find_user_by_id(&state.pool, &claims.sub)
        .await?
        .ok_or_else(unauthorized)?;
    if user.is_banned {
        return Err(unauthorized());
    }

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Missing or invalid access token".to_string())
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    if let Some(rest) = header.strip_prefix("Bearer ") {
        return Some(rest);
    }
    if let Some(rest) = header.strip_prefix("bearer ") {
        return Some(rest);
    }
    if let Some(space_idx) = header.find(' ') {
        let (scheme, rest) = header.split_at(space_idx);
        if scheme.eq_ignore_ascii_case("bearer") {
            return Some(rest.trim_start());
        }
    }
    None
}
