//! Models for device-bound refresh sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Server-side record of the currently valid refresh state for one device.
/// At most one row exists per device; re-issuing overwrites it.
pub struct DeviceSession {
    /// Opaque identifier distinguishing concurrent sessions of one user.
    pub device_id: String,
    /// Owner of the session.
    pub user_id: String,
    /// User-agent captured at issuance.
    pub device_name: Option<String>,
    /// Client address captured at issuance.
    pub ip: String,
    /// Issuance instant; must match the refresh token's `iat` to be honored.
    pub issued_at: DateTime<Utc>,
    /// Expiry mirroring the refresh token's `exp`.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public view of an active session for the device-management API.
pub struct DeviceSessionResponse {
    pub ip: String,
    pub title: String,
    pub last_active_date: DateTime<Utc>,
    pub device_id: String,
}

impl From<DeviceSession> for DeviceSessionResponse {
    fn from(session: DeviceSession) -> Self {
        DeviceSessionResponse {
            ip: session.ip,
            title: session
                .device_name
                .unwrap_or_else(|| "Unknown device".to_string()),
            last_active_date: session.issued_at,
            device_id: session.device_id,
        }
    }
}
