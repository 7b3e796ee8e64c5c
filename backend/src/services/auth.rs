//! The authentication orchestrator: composes the credential store, token
//! engine, session registry, revocation guard, and code issuance into the
//! login, rotation, confirmation, and recovery flows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    models::{
        device_session::DeviceSession,
        revoked_token::RevokedToken,
        user::{CreateUserRequest, User},
    },
    repositories::{
        device_session as session_repo, password_recovery as recovery_repo,
        revoked_token as revoked_repo, user as user_repo,
    },
    state::AppState,
    utils::{
        codes::{code_expiry, generate_code},
        email::Notifier,
        jwt::{
            create_access_token, issue_refresh_token, token_fingerprint, verify_refresh_token,
            RefreshClaims,
        },
        password::{hash_password, verify_password},
    },
};

#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    pool: PgPool,
    config: Config,
    notifier: Arc<dyn Notifier>,
}

impl AuthService {
    pub fn new(pool: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            config,
            notifier,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            state.config.clone(),
            Arc::clone(&state.notifier),
        )
    }

    /// Registers a new account and dispatches its confirmation code.
    pub async fn register(&self, payload: CreateUserRequest) -> Result<(), AppError> {
        if user_repo::find_user_by_login(&self.pool, &payload.login)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Login already exists".to_string()));
        }
        if user_repo::find_user_by_email(&self.pool, &payload.email)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Email already exists".to_string()));
        }

        let password_hash = hash_password_off_thread(payload.password).await?;
        let code = generate_code();
        let expires_at = code_expiry(Utc::now(), self.config.confirmation_code_expiration_hours);
        let user = User::new(
            payload.login,
            payload.email,
            password_hash,
            code.clone(),
            expires_at,
        );
        user_repo::insert_user(&self.pool, &user).await?;

        self.dispatch_confirmation(user.email, code);
        Ok(())
    }

    /// Verifies credentials and opens a session on a freshly minted device id.
    ///
    /// Every failure path returns the same `Unauthorized` so a caller cannot
    /// distinguish an unknown login from a wrong password, a banned account,
    /// or an unconfirmed one.
    pub async fn login(
        &self,
        login: &str,
        password: &str,
        ip: &str,
        device_name: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let user = user_repo::find_user_by_login(&self.pool, login)
            .await?
            .ok_or_else(invalid_credentials)?;
        if !user.can_login() {
            return Err(invalid_credentials());
        }

        let candidate = password.to_string();
        let stored_hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored_hash))
            .await
            .map_err(|err| AppError::InternalServerError(err.into()))??;
        if !matches {
            return Err(invalid_credentials());
        }

        let device_id = Uuid::new_v4().to_string();
        let (tokens, claims) = self.mint_pair(&user, device_id)?;
        self.record_session(&claims, ip, device_name).await?;

        Ok(tokens)
    }

    /// Exchanges a refresh token for a new pair bound to the same device.
    ///
    /// The token is spent through the revocation guard *before* its session
    /// is checked, so of two concurrent calls with the same token exactly
    /// one can rotate; the other observes the revocation and fails.
    pub async fn refresh(
        &self,
        raw_token: &str,
        ip: &str,
        device_name: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let claims = verify_refresh_token(raw_token, &self.config.refresh_token_secret)
            .map_err(|_| invalid_refresh_token())?;

        self.spend_refresh_token(raw_token, &claims, device_name)
            .await?;

        let issued_at = datetime_from_claim(claims.iat)?;
        session_repo::find_live_session(
            &self.pool,
            &claims.sub,
            &claims.device_id,
            issued_at,
            Utc::now(),
        )
        .await?
        .ok_or_else(session_gone)?;

        let user = user_repo::find_user_by_id(&self.pool, &claims.sub)
            .await?
            .ok_or_else(session_gone)?;
        if user.is_banned {
            return Err(session_gone());
        }

        let (tokens, new_claims) = self.mint_pair(&user, claims.device_id)?;
        session_repo::replace_session_window(
            &self.pool,
            &new_claims.device_id,
            datetime_from_claim(new_claims.iat)?,
            datetime_from_claim(new_claims.exp)?,
            ip,
            device_name,
        )
        .await?;

        Ok(tokens)
    }

    /// Spends the refresh token and closes its device session.
    pub async fn logout(&self, raw_token: &str, device_name: Option<&str>) -> Result<(), AppError> {
        let claims = verify_refresh_token(raw_token, &self.config.refresh_token_secret)
            .map_err(|_| invalid_refresh_token())?;

        self.spend_refresh_token(raw_token, &claims, device_name)
            .await?;

        session_repo::remove_session(&self.pool, &claims.device_id).await?;
        Ok(())
    }

    /// Flips the account to confirmed. Returns `false` (never an error) for
    /// an unknown code, an already confirmed account, or an expired code.
    pub async fn confirm_account(&self, code: &str) -> Result<bool, AppError> {
        let Some(user) = user_repo::find_user_by_confirmation_code(&self.pool, code).await? else {
            return Ok(false);
        };
        if user.is_confirmed {
            return Ok(false);
        }
        let expired = user
            .confirmation_expires_at
            .map_or(true, |expires| Utc::now() > expires);
        if expired {
            return Ok(false);
        }
        if user.confirmation_code.as_deref() != Some(code) {
            return Ok(false);
        }

        Ok(user_repo::set_confirmed(&self.pool, &user.id).await?)
    }

    /// Issues a fresh confirmation code, superseding the outstanding one.
    /// Returns `false` when the account is already confirmed.
    pub async fn resend_confirmation_code(&self, email: &str) -> Result<bool, AppError> {
        let user = user_repo::find_user_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| AppError::BadRequest("Email is not registered".to_string()))?;
        if user.is_confirmed {
            return Ok(false);
        }

        let code = generate_code();
        let expires_at = code_expiry(Utc::now(), self.config.confirmation_code_expiration_hours);
        user_repo::set_confirmation_code(&self.pool, &user.id, &code, expires_at).await?;

        self.dispatch_confirmation(user.email, code);
        Ok(true)
    }

    /// Issues a recovery code for the account behind `email`. An unknown
    /// email is a silent no-op; the endpoint must not leak existence.
    pub async fn send_recovery_code(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = user_repo::find_user_by_email(&self.pool, email).await? else {
            tracing::debug!("Password recovery requested for unknown email");
            return Ok(());
        };

        let now = Utc::now();
        recovery_repo::supersede_outstanding(&self.pool, &user.id, now).await?;

        let code = generate_code();
        let expires_at = code_expiry(now, self.config.recovery_code_expiration_hours);
        recovery_repo::create_recovery(&self.pool, &user.id, &code, expires_at).await?;

        self.dispatch_recovery(user.email, code);
        Ok(())
    }

    /// Consumes a recovery code and replaces the password. Unknown, expired,
    /// and already-used codes all fail with the same message.
    pub async fn confirm_password_recovery(
        &self,
        recovery_code: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let recovery = recovery_repo::find_valid_recovery_by_code(&self.pool, recovery_code, now)
            .await?
            .ok_or_else(invalid_recovery_code)?;

        let consumed = recovery_repo::mark_code_as_used(&self.pool, &recovery.id, now).await?;
        if !consumed {
            return Err(invalid_recovery_code());
        }

        let new_hash = hash_password_off_thread(new_password.to_string()).await?;
        user_repo::update_password_hash(&self.pool, &recovery.user_id, &new_hash).await?;

        // A recovered password invalidates every open session of the user.
        session_repo::delete_sessions_for_user(&self.pool, &recovery.user_id).await?;
        Ok(())
    }

    fn mint_pair(
        &self,
        user: &User,
        device_id: String,
    ) -> Result<(IssuedTokens, RefreshClaims), AppError> {
        let access_token = create_access_token(
            user.id.clone(),
            user.login.clone(),
            &self.config.access_token_secret,
            self.config.access_token_expiration_minutes,
        )?;
        let (refresh_token, claims) = issue_refresh_token(
            user.id.clone(),
            device_id,
            &self.config.refresh_token_secret,
            self.config.refresh_token_expiration_days,
        )?;

        Ok((
            IssuedTokens {
                access_token,
                refresh_token,
            },
            claims,
        ))
    }

    async fn record_session(
        &self,
        claims: &RefreshClaims,
        ip: &str,
        device_name: Option<&str>,
    ) -> Result<(), AppError> {
        let session = DeviceSession {
            device_id: claims.device_id.clone(),
            user_id: claims.sub.clone(),
            device_name: device_name.map(str::to_string),
            ip: ip.to_string(),
            issued_at: datetime_from_claim(claims.iat)?,
            expires_at: datetime_from_claim(claims.exp)?,
        };
        session_repo::upsert_session(&self.pool, &session).await?;
        Ok(())
    }

    /// Single-use enforcement. Must run before the session is confirmed so
    /// two concurrent calls with one token cannot both rotate.
    async fn spend_refresh_token(
        &self,
        raw_token: &str,
        claims: &RefreshClaims,
        user_agent: Option<&str>,
    ) -> Result<(), AppError> {
        let revocation = RevokedToken {
            token_hash: token_fingerprint(raw_token),
            user_id: claims.sub.clone(),
            user_agent: user_agent.map(str::to_string),
            expires_at: datetime_from_claim(claims.exp)?,
            revoked_at: Utc::now(),
        };
        let first_use = revoked_repo::revoke(&self.pool, &revocation).await?;
        if !first_use {
            tracing::warn!(user_id = %claims.sub, device_id = %claims.device_id, "Refresh token reuse detected");
            return Err(invalid_refresh_token());
        }
        Ok(())
    }

    fn dispatch_confirmation(&self, email: String, code: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::task::spawn_blocking(move || {
            if let Err(err) = notifier.send_confirmation_code(&email, &code) {
                tracing::warn!(error = %err, "Failed to deliver confirmation code");
            }
        });
    }

    fn dispatch_recovery(&self, email: String, code: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::task::spawn_blocking(move || {
            if let Err(err) = notifier.send_recovery_code(&email, &code) {
                tracing::warn!(error = %err, "Failed to deliver recovery code");
            }
        });
    }
}

async fn hash_password_off_thread(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| AppError::InternalServerError(err.into()))?
        .map_err(AppError::from)
}

fn datetime_from_claim(seconds: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
        AppError::InternalServerError(anyhow::anyhow!("Claim timestamp out of range: {seconds}"))
    })
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid login or password".to_string())
}

fn invalid_refresh_token() -> AppError {
    AppError::Unauthorized("Invalid or expired refresh token".to_string())
}

fn session_gone() -> AppError {
    AppError::Forbidden("Session is no longer active".to_string())
}

fn invalid_recovery_code() -> AppError {
    AppError::BadRequest("Recovery code is incorrect or expired".to_string())
}
