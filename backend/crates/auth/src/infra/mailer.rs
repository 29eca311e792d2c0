//! Mail Delivery
//!
//! Outbound mail is an infrastructure seam behind the [`Mailer`] trait.
//! The default implementation logs the link instead of sending anything,
//! which is what local development and tests want; a real transport can
//! implement the trait without touching the use cases.

use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// Outbound mail for the account-security flows
#[trait_variant::make(Mailer: Send)]
pub trait LocalMailer {
    /// Email-verification link (signup and re-request)
    async fn send_email_verification(&self, email: &Email, link: &str) -> AuthResult<()>;

    /// Passwordless sign-in link
    async fn send_magic_link(&self, email: &Email, link: &str) -> AuthResult<()>;

    /// Password reset link
    async fn send_password_reset(&self, email: &Email, link: &str) -> AuthResult<()>;
}

/// Logs links instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct TracingMailer;

impl Mailer for TracingMailer {
    async fn send_email_verification(&self, email: &Email, link: &str) -> AuthResult<()> {
        tracing::info!(email = %email, link = %link, "Email verification link issued");
        Ok(())
    }

    async fn send_magic_link(&self, email: &Email, link: &str) -> AuthResult<()> {
        tracing::info!(email = %email, link = %link, "Magic link issued");
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email, link: &str) -> AuthResult<()> {
        tracing::info!(email = %email, link = %link, "Password reset link issued");
        Ok(())
    }
}
