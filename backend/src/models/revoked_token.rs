//! Model for spent refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// A refresh token identity that has been exchanged or used for logout.
/// Presence of a row means the token may never be honored again.
pub struct RevokedToken {
    /// SHA-256 fingerprint of the raw token.
    pub token_hash: String,
    pub user_id: String,
    pub user_agent: Option<String>,
    /// The token's own expiry; rows past it can be garbage collected.
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}
