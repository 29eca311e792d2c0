//! Email Verification Use Case
//!
//! Issues and confirms the single-use email verification token created at
//! signup (or re-requested later). Confirming flips `email_verified`, the
//! gate credential sign-in checks.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::events::SecurityEventRecorder;
use crate::domain::entity::account_token::{AccountToken, TokenKind};
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;

/// Email verification use case (request + confirm)
pub struct VerifyEmailUseCase<R, M>
where
    R: AuthStore,
    M: Mailer,
{
    repo: Arc<R>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<R, M> VerifyEmailUseCase<R, M>
where
    R: AuthStore,
    M: Mailer + Send + Sync,
{
    pub fn new(repo: Arc<R>, mailer: Arc<M>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            mailer,
            config,
        }
    }

    /// Re-send the verification mail. Enumeration-safe: the response does
    /// not reveal whether the email is registered or already verified.
    pub async fn request(&self, email: &str, client: &ClientInfo) -> AuthResult<()> {
        let events = SecurityEventRecorder::new(self.repo.clone());
        let email = Email::new(email)?;

        let Some(user) = self.repo.find_by_email(&email).await? else {
            return Ok(());
        };
        if user.email_verified {
            return Ok(());
        }

        self.repo
            .delete_tokens_for_email(TokenKind::EmailVerification, &email)
            .await?;
        let token = AccountToken::issue(
            TokenKind::EmailVerification,
            email.clone(),
            self.config.verification_ttl_chrono(),
        );
        self.repo.store_token(&token).await?;

        let link = format!(
            "{}/api/auth/verify-email/confirm?token={}",
            self.config.base_url, token.token
        );
        self.mailer.send_email_verification(&email, &link).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::EmailVerificationRequested,
                Some(user.user_id),
                json!({}),
                client,
            ))
            .await?;

        Ok(())
    }

    /// Confirm a verification token and mark the email verified.
    pub async fn confirm(&self, token: &str, client: &ClientInfo) -> AuthResult<()> {
        let events = SecurityEventRecorder::new(self.repo.clone());
        let now = Utc::now();

        let consumed = self
            .repo
            .consume_token(TokenKind::EmailVerification, token)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if consumed.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }

        let mut user = self
            .repo
            .find_by_email(&consumed.email)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if !user.email_verified {
            user.mark_email_verified();
            self.repo.update(&user).await?;
        }

        events
            .record(SecurityEvent::new(
                SecurityEventKind::EmailVerified,
                Some(user.user_id),
                json!({}),
                client,
            ))
            .await?;

        tracing::info!(public_id = %user.public_id, "Email verified");

        Ok(())
    }
}
