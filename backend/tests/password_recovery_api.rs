use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

use bloggers_backend::{
    handlers::auth, repositories::password_recovery as recovery_repo,
    utils::codes::generate_code,
};

mod support;

fn recovery_router(pool: PgPool) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/password-recovery", post(auth::password_recovery))
        .route("/api/auth/new-password", post(auth::new_password))
        .with_state(support::test_state(pool))
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

async fn live_recovery_count(pool: &PgPool, user_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM password_recoveries WHERE user_id = $1 AND used_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .expect("count live recoveries")
}

#[tokio::test]
async fn recovery_request_is_silent_for_unknown_email() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let app = recovery_router(pool.clone());

    let response = app
        .oneshot(post_json(
            "/api/auth/password-recovery",
            json!({ "email": "ghost@example.com" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call recovery");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn repeated_requests_supersede_outstanding_codes() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;
    let app = recovery_router(pool.clone());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/password-recovery",
                json!({ "email": user.email }),
                &support::unique_ip(),
            ))
            .await
            .expect("call recovery");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    // Two rows issued, but only the latest one is still consumable.
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM password_recoveries WHERE user_id = $1")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .expect("count recoveries");
    assert_eq!(total, 2);
    assert_eq!(live_recovery_count(&pool, &user.id).await, 1);
}

#[tokio::test]
async fn new_password_consumes_the_code_exactly_once() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "OldSecret1!").await;
    let app = recovery_router(pool.clone());

    let code = generate_code();
    recovery_repo::create_recovery(&pool, &user.id, &code, Utc::now() + Duration::hours(1))
        .await
        .expect("store recovery code");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/new-password",
            json!({ "newPassword": "NewSecret1!", "recoveryCode": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call new-password");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(live_recovery_count(&pool, &user.id).await, 0);

    // The old password is dead, the new one works.
    let old_login = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "login": user.login, "password": "OldSecret1!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call login");
    assert_eq!(old_login.status(), StatusCode::UNAUTHORIZED);

    let new_login = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "login": user.login, "password": "NewSecret1!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call login");
    assert_eq!(new_login.status(), StatusCode::OK);

    // Replaying the consumed code must fail.
    let replay = app
        .oneshot(post_json(
            "/api/auth/new-password",
            json!({ "newPassword": "Another1!", "recoveryCode": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call new-password again");
    assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_and_unknown_codes_fail_identically() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;
    let app = recovery_router(pool.clone());

    let code = generate_code();
    recovery_repo::create_recovery(&pool, &user.id, &code, Utc::now() - Duration::minutes(5))
        .await
        .expect("store expired code");

    let expired = app
        .clone()
        .oneshot(post_json(
            "/api/auth/new-password",
            json!({ "newPassword": "NewSecret1!", "recoveryCode": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call new-password");
    let unknown = app
        .oneshot(post_json(
            "/api/auth/new-password",
            json!({ "newPassword": "NewSecret1!", "recoveryCode": "no-such-code" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call new-password");

    assert_eq!(expired.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_json(expired).await,
        response_json(unknown).await,
        "wrong, expired, and consumed codes must be indistinguishable"
    );
}

#[tokio::test]
async fn successful_recovery_terminates_open_sessions() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "OldSecret1!").await;
    let app = recovery_router(pool.clone());

    let login = app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            json!({ "login": user.login, "password": "OldSecret1!" }),
            &support::unique_ip(),
        ))
        .await
        .expect("call login");
    assert_eq!(login.status(), StatusCode::OK);

    let code = generate_code();
    recovery_repo::create_recovery(&pool, &user.id, &code, Utc::now() + Duration::hours(1))
        .await
        .expect("store recovery code");

    let response = app
        .oneshot(post_json(
            "/api/auth/new-password",
            json!({ "newPassword": "NewSecret1!", "recoveryCode": code }),
            &support::unique_ip(),
        ))
        .await
        .expect("call new-password");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let sessions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM device_sessions WHERE user_id = $1")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .expect("count sessions");
    assert_eq!(sessions, 0, "recovery invalidates every open session");
}
