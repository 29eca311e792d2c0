//! Sign Up Use Case
//!
//! Registers a new customer or vendor account with email + password,
//! then issues the email verification token.

use std::sync::Arc;

use platform::client::ClientInfo;
use platform::rate_limit::RateLimitStore;
use serde_json::json;

use crate::application::config::AuthConfig;
use crate::application::events::SecurityEventRecorder;
use crate::application::rate_limit::{RateLimitAction, RateLimiter};
use crate::domain::entity::account_token::{AccountToken, TokenKind};
use crate::domain::entity::credential::Credential;
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entity::user::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    /// Customer or Vendor; admin accounts are never self-registered
    pub role: UserRole,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub public_id: String,
}

/// Sign up use case
pub struct SignUpUseCase<R, S, M>
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

impl<R, S, M> SignUpUseCase<R, S, M>
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

    pub async fn execute(
        &self,
        input: SignUpInput,
        client: &ClientInfo,
    ) -> AuthResult<SignUpOutput> {
        let events = SecurityEventRecorder::new(self.repo.clone());

        let rate = self.rate_limiter.check(RateLimitAction::SignUp, client).await;
        if !rate.allowed {
            events
                .record(SecurityEvent::new(
                    SecurityEventKind::RateLimitExceeded,
                    None,
                    json!({ "action": "sign_up" }),
                    client,
                ))
                .await?;
            return Err(AuthError::RateLimited);
        }

        let email = Email::new(&input.email)?;

        if self.repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        // Self-registration only creates customer or vendor accounts
        if input.role.is_admin() {
            return Err(AuthError::Validation(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let raw_password = RawPassword::new(input.password)?;
        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        let user = User::new(email.clone(), input.display_name, input.role);
        let credential = Credential::new(user.user_id, password_hash);

        self.repo.create(&user).await?;
        self.repo.create_credential(&credential).await?;

        // Issue the verification token; any previous one for this email is
        // superseded
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
                SecurityEventKind::SignUp,
                Some(user.user_id),
                json!({ "role": user.role.code() }),
                client,
            ))
            .await?;

        tracing::info!(
            public_id = %user.public_id,
            role = %user.role,
            "User signed up"
        );

        Ok(SignUpOutput {
            public_id: user.public_id.to_string(),
        })
    }
}
