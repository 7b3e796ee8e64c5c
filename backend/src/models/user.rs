//! Models for user accounts and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of a platform account.
///
/// An account is either confirmed, or unconfirmed with a pending
/// confirmation code and expiry; never both.
pub struct User {
    /// Unique identifier for the user.
    pub id: String,
    /// Immutable login used for authentication.
    pub login: String,
    /// Email address the confirmation/recovery codes are delivered to.
    pub email: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub is_confirmed: bool,
    /// Pending confirmation code, cleared once confirmed.
    pub confirmation_code: Option<String>,
    /// Expiry of the pending confirmation code.
    pub confirmation_expires_at: Option<DateTime<Utc>>,
    /// Banned accounts cannot authenticate.
    pub is_banned: bool,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Constructs a new unconfirmed user with a pending confirmation code.
    pub fn new(
        login: String,
        email: String,
        password_hash: String,
        confirmation_code: String,
        confirmation_expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            login,
            email,
            password_hash,
            is_confirmed: false,
            confirmation_code: Some(confirmation_code),
            confirmation_expires_at: Some(confirmation_expires_at),
            is_banned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while a confirmation code is outstanding.
    pub fn has_pending_confirmation(&self) -> bool {
        !self.is_confirmed && self.confirmation_code.is_some()
    }

    /// Returns `true` when the account may authenticate.
    pub fn can_login(&self) -> bool {
        self.is_confirmed && !self.is_banned
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for registering a new account.
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 10, message = "Login must be 3-10 characters"))]
    pub login: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 20, message = "Password must be 6-20 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Access token returned after login or rotation; the refresh token travels
/// in an httpOnly cookie, never in the body.
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Payload carrying an email confirmation code.
pub struct ConfirmationCodePayload {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Payload naming an account by email (resend confirmation, recovery).
pub struct EmailPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload completing a password recovery.
pub struct NewPasswordPayload {
    #[validate(length(min = 6, max = 20, message = "Password must be 6-20 characters"))]
    pub new_password: String,
    #[validate(length(min = 1, message = "Recovery code is required"))]
    pub recovery_code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Identity of the authenticated caller.
pub struct MeResponse {
    pub email: String,
    pub login: String,
    pub user_id: String,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        MeResponse {
            email: user.email,
            login: user.login,
            user_id: user.id,
        }
    }
}
