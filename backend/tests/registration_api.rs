use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware as axum_middleware,
    routing::post,
    Router,
};
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

use bloggers_backend::{
    handlers::auth, middleware::rate_limit, state::AppState, utils::password::verify_password,
};

mod support;

fn registration_router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/registration", post(auth::registration))
        .route(
            "/api/auth/registration-confirmation",
            post(auth::registration_confirmation),
        )
        .route(
            "/api/auth/registration-email-resending",
            post(auth::registration_email_resending),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_by_ip,
        ))
        .with_state(state)
}

fn post_json(uri: &str, payload: serde_json::Value, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse json body")
}

async fn fetch_confirmation_state(
    pool: &PgPool,
    login: &str,
) -> (bool, Option<String>, Option<chrono::DateTime<chrono::Utc>>) {
    sqlx::query_as(
        "SELECT is_confirmed, confirmation_code, confirmation_expires_at FROM users WHERE login = $1",
    )
    .bind(login)
    .fetch_one(pool)
    .await
    .expect("fetch confirmation state")
}

#[tokio::test]
async fn registration_creates_unconfirmed_user_with_pending_code() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let app = registration_router(support::test_state(pool.clone()));

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let login = format!("r{}", &suffix[..8]);
    let email = format!("reg_{}@example.com", suffix);
    let response = app
        .oneshot(post_json(
            "/api/auth/registration",
            json!({ "login": login, "email": email, "password": "Secret123!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call registration");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (is_confirmed, code, expires_at) = fetch_confirmation_state(&pool, &login).await;
    assert!(!is_confirmed);
    assert!(code.is_some());
    assert!(expires_at.expect("expiry set") > chrono::Utc::now());

    let stored_hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE login = $1")
        .bind(&login)
        .fetch_one(&pool)
        .await
        .expect("fetch hash");
    assert_ne!(stored_hash, "Secret123!");
    assert!(verify_password("Secret123!", &stored_hash).unwrap());
}

#[tokio::test]
async fn registration_rejects_taken_login_and_email() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let existing = support::seed_confirmed_user(&pool, "Secret123!").await;
    let app = registration_router(support::test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration",
            json!({ "login": existing.login, "email": "fresh@example.com", "password": "Secret123!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/api/auth/registration",
            json!({ "login": "fresh1", "email": existing.email, "password": "Secret123!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_validates_payload_shape() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let app = registration_router(support::test_state(pool.clone()));

    let response = app
        .oneshot(post_json(
            "/api/auth/registration",
            json!({ "login": "ab", "email": "not-an-email", "password": "short" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn confirmation_flips_the_account_exactly_once() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let code = bloggers_backend::utils::codes::generate_code();
    let user = support::seed_unconfirmed_user(
        &pool,
        &code,
        chrono::Utc::now() + chrono::Duration::hours(24),
    )
    .await;
    let app = registration_router(support::test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (is_confirmed, stored_code, _) = fetch_confirmation_state(&pool, &user.login).await;
    assert!(is_confirmed);
    assert!(stored_code.is_none(), "pending code cleared on confirmation");

    // The code is gone; replaying it reads as unknown.
    let response = app
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation again");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_code_fails_identically_to_unknown_code() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let code = bloggers_backend::utils::codes::generate_code();
    support::seed_unconfirmed_user(&pool, &code, chrono::Utc::now() - chrono::Duration::hours(1))
        .await;
    let app = registration_router(support::test_state(pool.clone()));

    let expired = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation");
    let unknown = app
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": "no-such-code" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation");

    assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(expired).await,
        response_json(unknown).await,
        "expired and unknown codes must be indistinguishable"
    );
}

#[tokio::test]
async fn resending_supersedes_the_pending_code() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let old_code = bloggers_backend::utils::codes::generate_code();
    let user = support::seed_unconfirmed_user(
        &pool,
        &old_code,
        chrono::Utc::now() + chrono::Duration::hours(24),
    )
    .await;
    let app = registration_router(support::test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration-email-resending",
            json!({ "email": user.email }),
            &support::unique_ip(),
        ))
        .await
        .expect("call resend");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, new_code, _) = fetch_confirmation_state(&pool, &user.login).await;
    let new_code = new_code.expect("fresh code pending");
    assert_ne!(new_code, old_code);

    // Only the superseding code confirms.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": old_code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation with old code");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/api/auth/registration-confirmation",
            json!({ "code": new_code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call confirmation with new code");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn resending_fails_for_confirmed_or_unknown_accounts() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let confirmed = support::seed_confirmed_user(&pool, "Secret123!").await;
    let app = registration_router(support::test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/registration-email-resending",
            json!({ "email": confirmed.email }),
            &support::unique_ip(),
        ))
        .await
        .expect("call resend");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/api/auth/registration-email-resending",
            json!({ "email": "nobody@example.com" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call resend");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
