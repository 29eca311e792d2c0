//! Password Reset Use Case
//!
//! Request is enumeration-safe and supersedes any earlier reset token for
//! the same email; only the most recently issued token can complete the
//! reset. Completing a reset also clears lockout state, since the account
//! owner has just re-proven control.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;
use platform::rate_limit::RateLimitStore;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::events::SecurityEventRecorder;
use crate::application::rate_limit::{RateLimitAction, RateLimiter};
use crate::domain::entity::account_token::{AccountToken, TokenKind};
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;

/// Password reset use case (request + confirm)
pub struct PasswordResetUseCase<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore,
    M: Mailer,
{
    repo: Arc<R>,
    rate_limiter: RateLimiter<S>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<R, S, M> PasswordResetUseCase<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync,
    M: Mailer + Send + Sync,
{
    pub fn new(
        repo: Arc<R>,
        rate_store: Arc<S>,
        mailer: Arc<M>,
        config: Arc<AuthConfig>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(rate_store, config.rate_limit.clone());
        Self {
            repo,
            rate_limiter,
            mailer,
            config,
        }
    }

    /// Request a reset link. Succeeds with no distinguishable output
    /// whether or not the email belongs to an account.
    pub async fn request(&self, email: &str, client: &ClientInfo) -> AuthResult<()> {
        let events = SecurityEventRecorder::new(self.repo.clone());

        let rate = self
            .rate_limiter
            .check(RateLimitAction::PasswordReset, client)
            .await;
        if !rate.allowed {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::RateLimitExceeded,
                    None,
                    json!({ "action": "password_reset" }),
                    client,
                ))
                .await?;
            return Err(AuthError::RateLimited);
        }

        let email = Email::new(email)?;

        let Some(user) = self.repo.find_by_email(&email).await? else {
            return Ok(());
        };

        // Only the most recent reset token stays valid
        self.repo
            .delete_tokens_for_email(TokenKind::PasswordReset, &email)
            .await?;
        let token = AccountToken::issue(
            TokenKind::PasswordReset,
            email.clone(),
            self.config.reset_ttl_chrono(),
        );
        self.repo.store_token(&token).await?;

        let link = format!(
            "{}/reset-password?token={}",
            self.config.base_url, token.token
        );
        self.mailer.send_password_reset(&email, &link).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::PasswordResetRequested,
                Some(user.user_id),
                json!({}),
                client,
            ))
            .await?;

        Ok(())
    }

    /// Complete a reset: consume the token, validate and store the new
    /// password, clear lockout state.
    pub async fn confirm(
        &self,
        token: &str,
        new_password: String,
        client: &ClientInfo,
    ) -> AuthResult<()> {
        let events = SecurityEventRecorder::new(self.repo.clone());
        let now = Utc::now();

        let consumed = self
            .repo
            .consume_token(TokenKind::PasswordReset, token)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if consumed.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }

        let user = self
            .repo
            .find_by_email(&consumed.email)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let raw_password = RawPassword::new(new_password)?;
        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        self.repo
            .update_password(&user.user_id, password_hash.as_str())
            .await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::PasswordResetCompleted,
                Some(user.user_id),
                json!({}),
                client,
            ))
            .await?;

        tracing::info!(public_id = %user.public_id, "Password reset completed");

        Ok(())
    }
}
