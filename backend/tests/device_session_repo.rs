use chrono::{Duration, DurationRound, Utc};

use bloggers_backend::{
    models::device_session::DeviceSession, repositories::device_session as session_repo,
};

mod support;

fn session(user_id: &str, device_id: &str, issued_offset: Duration) -> DeviceSession {
    // Claims carry whole seconds, so sessions do too.
    let issued_at = (Utc::now() + issued_offset)
        .duration_trunc(Duration::seconds(1))
        .expect("truncate to seconds");
    DeviceSession {
        device_id: device_id.to_string(),
        user_id: user_id.to_string(),
        device_name: Some("Firefox".to_string()),
        ip: "1.2.3.4".to_string(),
        issued_at,
        expires_at: issued_at + Duration::days(7),
    }
}

#[tokio::test]
async fn upsert_overwrites_the_prior_session_for_a_device() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;

    let device_id = format!("device-{}", uuid::Uuid::new_v4());
    let first = session(&user.id, &device_id, Duration::seconds(-10));
    session_repo::upsert_session(&pool, &first)
        .await
        .expect("create session");

    let second = session(&user.id, &device_id, Duration::seconds(0));
    session_repo::upsert_session(&pool, &second)
        .await
        .expect("overwrite session");

    let sessions = session_repo::list_live_sessions_for_user(&pool, &user.id, Utc::now())
        .await
        .expect("list sessions");
    assert_eq!(sessions.len(), 1, "one live session per device");
    assert_eq!(sessions[0].issued_at, second.issued_at);

    // The superseded window no longer resolves.
    let stale = session_repo::find_live_session(
        &pool,
        &user.id,
        &device_id,
        first.issued_at,
        Utc::now(),
    )
    .await
    .expect("lookup");
    assert!(stale.is_none());
}

#[tokio::test]
async fn live_lookup_rejects_expired_and_mismatched_sessions() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;

    let device_id = format!("device-{}", uuid::Uuid::new_v4());
    let mut record = session(&user.id, &device_id, Duration::seconds(0));
    record.expires_at = Utc::now() - Duration::seconds(5);
    session_repo::upsert_session(&pool, &record)
        .await
        .expect("create expired session");

    let found =
        session_repo::find_live_session(&pool, &user.id, &device_id, record.issued_at, Utc::now())
            .await
            .expect("lookup");
    assert!(found.is_none(), "expired sessions read as absent");

    let listed = session_repo::list_live_sessions_for_user(&pool, &user.id, Utc::now())
        .await
        .expect("list");
    assert!(listed.is_empty());
}

#[tokio::test]
async fn remove_reports_whether_a_session_existed() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;

    let device_id = format!("device-{}", uuid::Uuid::new_v4());
    let record = session(&user.id, &device_id, Duration::seconds(0));
    session_repo::upsert_session(&pool, &record)
        .await
        .expect("create session");

    assert!(session_repo::remove_session(&pool, &device_id)
        .await
        .expect("remove"));
    assert!(!session_repo::remove_session(&pool, &device_id)
        .await
        .expect("remove again"));
}

#[tokio::test]
async fn remove_other_sessions_spares_the_kept_device() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;
    let user = support::seed_confirmed_user(&pool, "Secret123!").await;

    let kept = format!("device-{}", uuid::Uuid::new_v4());
    session_repo::upsert_session(&pool, &session(&user.id, &kept, Duration::seconds(0)))
        .await
        .expect("create kept session");
    for _ in 0..3 {
        let other = format!("device-{}", uuid::Uuid::new_v4());
        session_repo::upsert_session(&pool, &session(&user.id, &other, Duration::seconds(0)))
            .await
            .expect("create other session");
    }

    let removed = session_repo::remove_other_sessions(&pool, &user.id, &kept)
        .await
        .expect("remove others");
    assert_eq!(removed, 3);

    let sessions = session_repo::list_live_sessions_for_user(&pool, &user.id, Utc::now())
        .await
        .expect("list sessions");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].device_id, kept);
}
