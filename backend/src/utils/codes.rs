//! One-time code issuance for email confirmation and password recovery.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Opaque random code; carries no information about the subject.
pub fn generate_code() -> String {
    Uuid::new_v4().to_string()
}

pub fn code_expiry(now: DateTime<Utc>, ttl_hours: u64) -> DateTime<Utc> {
    now + Duration::hours(ttl_hours as i64)
}

/// Recovery codes are stored hashed; a database leak must not expose live codes.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}
