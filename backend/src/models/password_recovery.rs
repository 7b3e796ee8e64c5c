//! Models for password recovery codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a time-boxed recovery code.
pub struct PasswordRecovery {
    /// Unique identifier for the recovery record.
    pub id: String,
    /// User the code was issued for.
    pub user_id: String,
    /// SHA-256 hash of the recovery code.
    pub code_hash: String,
    /// Timestamp when this code expires.
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Timestamp when this code was consumed (null if not yet used).
    pub used_at: Option<DateTime<Utc>>,
}
