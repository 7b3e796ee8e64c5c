//! Model for rate-limit attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One request attempt against a protected endpoint. Append-only; counted
/// over a trailing window and pruned only by the cleanup binary.
pub struct LimitAttempt {
    pub ip: String,
    /// Login or email component of the key; empty for ip-only keys.
    pub login: String,
    pub endpoint: String,
    pub attempted_at: DateTime<Utc>,
}
