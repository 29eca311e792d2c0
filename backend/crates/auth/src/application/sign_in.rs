//! Credential Sign-In Use Case
//!
//! Authenticates an email/password pair and issues a session token.
//!
//! Check order: rate limit, email parse, account lookup, lazy unlock,
//! lockout, email verification, account status, password. A locked account
//! rejects even a correct password without any hash comparison. Every
//! outcome, success or failure, appends a security event.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;
use platform::rate_limit::RateLimitStore;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::events::SecurityEventRecorder;
use crate::application::rate_limit::{RateLimitAction, RateLimiter};
use crate::application::session::SessionTokenService;
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entity::user::User;
use crate::domain::repository::AuthStore;
use crate::domain::suspicion;
use crate::domain::value_object::{email::Email, user_password::RawPassword, user_role::UserRole};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub public_id: String,
    pub role: UserRole,
    pub email_verified: bool,
    /// Session JWT for the cookie
    pub session_token: String,
}

/// Credential sign-in use case
pub struct SignInUseCase<R, S>
where
    R: AuthStore,
    S: RateLimitStore,
{
    repo: Arc<R>,
    rate_limiter: RateLimiter<S>,
    sessions: Arc<SessionTokenService>,
    config: Arc<AuthConfig>,
}

impl<R, S> SignInUseCase<R, S>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync,
{
    pub fn new(
        repo: Arc<R>,
        rate_store: Arc<S>,
        sessions: Arc<SessionTokenService>,
        config: Arc<AuthConfig>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(rate_store, config.rate_limit.clone());
        Self {
            repo,
            rate_limiter,
            sessions,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SignInInput,
        client: &ClientInfo,
    ) -> AuthResult<SignInOutput> {
        let events = SecurityEventRecorder::new(self.repo.clone());
        let now = Utc::now();

        let rate = self.rate_limiter.check(RateLimitAction::SignIn, client).await;
        if !rate.allowed {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::RateLimitExceeded,
                    None,
                    json!({ "action": "sign_in" }),
                    client,
                ))
                .await?;
            return Err(AuthError::RateLimited);
        }

        // Unknown email and wrong password surface identically
        let Ok(email) = Email::new(&input.email) else {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    None,
                    json!({ "reason": "invalid_email" }),
                    client,
                ))
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        let Some(user) = self.repo.find_by_email(&email).await? else {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    None,
                    json!({ "reason": "unknown_email", "email": email.as_str() }),
                    client,
                ))
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        let Some(mut credential) = self.repo.find_credential(&user.user_id).await? else {
            // OAuth-only account, no password to check
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Some(user.user_id),
                    json!({ "reason": "no_password_credential" }),
                    client,
                ))
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        // Lazy unlock: an expired lockout clears on this read, there is no
        // background sweep
        if credential.lock_expired(now) {
            self.repo.reset_lockout(&user.user_id).await?;
            credential.reset_failures(now);
        }

        if credential.is_locked(now) {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Some(user.user_id),
                    json!({
                        "reason": "account_locked",
                        "lockedUntil": credential.locked_until.map(|t| t.timestamp_millis()),
                    }),
                    client,
                ))
                .await?;
            return Err(AuthError::AccountLocked);
        }

        if !user.email_verified {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Some(user.user_id),
                    json!({ "reason": "email_not_verified" }),
                    client,
                ))
                .await?;
            return Err(AuthError::EmailNotVerified);
        }

        if !user.can_login() {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Some(user.user_id),
                    json!({ "reason": "account_inactive", "status": user.status.code() }),
                    client,
                ))
                .await?;
            return Err(AuthError::AccountInactive);
        }

        let password_valid = match RawPassword::new(input.password) {
            Ok(raw) => credential.password_hash.verify(&raw, self.config.pepper())?,
            // Input that fails policy can never match a stored hash
            Err(_) => false,
        };

        if !password_valid {
            let outcome = self
                .repo
                .record_failed_attempt(
                    &user.user_id,
                    self.config.max_failed_attempts,
                    self.config.lockout_chrono(),
                )
                .await?;

            events
                .record(SecurityEvent::new(
                    SecurityEventKind::LoginFailed,
                    Some(user.user_id),
                    json!({
                        "reason": "invalid_password",
                        "failedAttempts": outcome.failed_attempts,
                    }),
                    client,
                ))
                .await?;

            if outcome.locked {
                events
                    .record(SecurityEvent::new(
                        SecurityEventKind::AccountLocked,
                        Some(user.user_id),
                        json!({
                            "failedAttempts": outcome.failed_attempts,
                            "lockedUntil": outcome.locked_until.map(|t| t.timestamp_millis()),
                        }),
                        client,
                    ))
                    .await?;
                return Err(AuthError::AccountLocked);
            }

            return Err(AuthError::InvalidCredentials);
        }

        // Success. Advisory suspicion signal is computed before counters
        // reset so the failed attempts that led here still count.
        let summary = events.activity_summary(&user, now).await?;
        let suspicion_reasons = suspicion::evaluate(&summary);

        self.repo.reset_lockout(&user.user_id).await?;

        let mut user: User = user;
        user.record_login();
        self.repo.update(&user).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::LoginSuccess,
                Some(user.user_id),
                json!({ "suspicion": &suspicion_reasons }),
                client,
            ))
            .await?;

        if !suspicion_reasons.is_empty() {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::SuspiciousActivity,
                    Some(user.user_id),
                    json!({ "reasons": &suspicion_reasons }),
                    client,
                ))
                .await?;
        }

        let session_token = self.sessions.issue(&user)?;

        tracing::info!(
            public_id = %user.public_id,
            suspicious = !suspicion_reasons.is_empty(),
            "User signed in"
        );

        Ok(SignInOutput {
            public_id: user.public_id.to_string(),
            role: user.role,
            email_verified: user.email_verified,
            session_token,
        })
    }
}
