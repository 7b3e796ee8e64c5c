//! Data models shared across database access and API handlers.

pub mod device_session;
pub mod password_recovery;
pub mod rate_limit;
pub mod revoked_token;
pub mod user;
