//! Magic Link Use Case
//!
//! Passwordless sign-in: a single-use token is mailed to the account's
//! address; following the link completes the sign-in. The request endpoint
//! answers identically whether or not the email is registered, so it leaks
//! nothing. Using a link also proves mailbox ownership, so the email is
//! marked verified on first use.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;
use platform::rate_limit::RateLimitStore;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::events::SecurityEventRecorder;
use crate::application::rate_limit::{RateLimitAction, RateLimiter};
use crate::application::session::SessionTokenService;
use crate::application::sign_in::SignInOutput;
use crate::domain::entity::account_token::{AccountToken, TokenKind};
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;

/// Magic-link use case (request + callback)
pub struct MagicLinkUseCase<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore,
    M: Mailer,
{
    repo: Arc<R>,
    rate_limiter: RateLimiter<S>,
    mailer: Arc<M>,
    sessions: Arc<SessionTokenService>,
    config: Arc<AuthConfig>,
}

impl<R, S, M> MagicLinkUseCase<R, S, M>
where
    R: AuthStore,
    S: RateLimitStore + Send + Sync,
    M: Mailer + Send + Sync,
{
    pub fn new(
        repo: Arc<R>,
        rate_store: Arc<S>,
        mailer: Arc<M>,
        sessions: Arc<SessionTokenService>,
        config: Arc<AuthConfig>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(rate_store, config.rate_limit.clone());
        Self {
            repo,
            rate_limiter,
            mailer,
            sessions,
            config,
        }
    }

    /// Request a magic link. Succeeds with no distinguishable output
    /// whether or not the email belongs to an account.
    pub async fn request(&self, email: &str, client: &ClientInfo) -> AuthResult<()> {
        let events = SecurityEventRecorder::new(self.repo.clone());

        let rate = self
            .rate_limiter
            .check(RateLimitAction::MagicLink, client)
            .await;
        if !rate.allowed {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::RateLimitExceeded,
                    None,
                    json!({ "action": "magic_link" }),
                    client,
                ))
                .await?;
            return Err(AuthError::RateLimited);
        }

        let email = Email::new(email)?;

        let Some(user) = self.repo.find_by_email(&email).await? else {
            // Same response as the known-email path
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::MagicLinkRequested,
                    None,
                    json!({ "known": false, "email": email.as_str() }),
                    client,
                ))
                .await?;
            return Ok(());
        };

        self.repo
            .delete_tokens_for_email(TokenKind::MagicLink, &email)
            .await?;
        let token = AccountToken::issue(
            TokenKind::MagicLink,
            email.clone(),
            self.config.magic_link_ttl_chrono(),
        );
        self.repo.store_token(&token).await?;

        let link = format!(
            "{}/api/auth/magic-link/callback?token={}",
            self.config.base_url, token.token
        );
        self.mailer.send_magic_link(&email, &link).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::MagicLinkRequested,
                Some(user.user_id),
                json!({ "known": true }),
                client,
            ))
            .await?;

        Ok(())
    }

    /// Complete a magic-link sign-in from the emailed callback.
    pub async fn verify(&self, token: &str, client: &ClientInfo) -> AuthResult<SignInOutput> {
        let events = SecurityEventRecorder::new(self.repo.clone());
        let now = Utc::now();

        let consumed = self
            .repo
            .consume_token(TokenKind::MagicLink, token)
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

        if !user.can_login() {
            return Err(AuthError::AccountInactive);
        }

        // A used link proves mailbox ownership
        if !user.email_verified {
            user.mark_email_verified();
        }
        user.record_login();
        self.repo.update(&user).await?;

        events
            .record(SecurityEvent::new(
                SecurityEventKind::MagicLinkUsed,
                Some(user.user_id),
                json!({}),
                client,
            ))
            .await?;

        let session_token = self.sessions.issue(&user)?;

        tracing::info!(public_id = %user.public_id, "User signed in via magic link");

        Ok(SignInOutput {
            public_id: user.public_id.to_string(),
            role: user.role,
            email_verified: user.email_verified,
            session_token,
        })
    }
}
