use chrono::{DateTime, Duration, Utc};

use bloggers_backend::{
    models::revoked_token::RevokedToken, repositories::revoked_token as revoked_repo,
};

mod support;

fn revocation(expires_at: DateTime<Utc>) -> RevokedToken {
    RevokedToken {
        token_hash: format!("hash-{}", uuid::Uuid::new_v4()),
        user_id: "user-1".to_string(),
        user_agent: Some("integration-tests".to_string()),
        expires_at,
        revoked_at: Utc::now(),
    }
}

#[tokio::test]
async fn first_revocation_wins_and_replays_lose() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;

    let token = revocation(Utc::now() + Duration::days(7));

    let first = revoked_repo::revoke(&pool, &token).await.expect("revoke");
    assert!(first, "first consumption of the token succeeds");

    let second = revoked_repo::revoke(&pool, &token).await.expect("revoke");
    assert!(!second, "replayed consumption must lose");

    assert!(revoked_repo::is_revoked(&pool, &token.token_hash)
        .await
        .expect("check"));
}

#[tokio::test]
async fn concurrent_revocations_have_exactly_one_winner() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;

    let token = revocation(Utc::now() + Duration::days(7));

    let (a, b) = tokio::join!(
        revoked_repo::revoke(&pool, &token),
        revoked_repo::revoke(&pool, &token),
    );
    let a = a.expect("revoke a");
    let b = b.expect("revoke b");

    assert!(a ^ b, "exactly one of two concurrent revocations may win");
}

#[tokio::test]
async fn cleanup_drops_only_rows_past_token_expiry() {
    let pool = support::test_pool().await;
    support::migrate_db(&pool).await;

    let stale = revocation(Utc::now() - Duration::hours(1));
    let live = revocation(Utc::now() + Duration::days(7));
    revoked_repo::revoke(&pool, &stale).await.expect("revoke stale");
    revoked_repo::revoke(&pool, &live).await.expect("revoke live");

    revoked_repo::cleanup_expired(&pool).await.expect("cleanup");

    assert!(!revoked_repo::is_revoked(&pool, &stale.token_hash)
        .await
        .expect("check stale"));
    assert!(revoked_repo::is_revoked(&pool, &live.token_hash)
        .await
        .expect("check live"));
}
