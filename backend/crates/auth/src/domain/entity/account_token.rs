//! Account Token Entity
//!
//! Single-use random tokens for email verification, password reset and
//! magic-link sign-in. Each kind is a distinct tagged value rather than a
//! prefix baked into the token string, so the three namespaces can never
//! collide. Only the most recently issued token of a kind is valid for a
//! given email: issuing deletes its predecessors.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::{TOKEN_LENGTH, random_token};
use uuid::Uuid;

use crate::domain::value_object::email::Email;

/// Token kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
    MagicLink,
}

impl TokenKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::MagicLink => "magic_link",
        }
    }

    pub fn from_str(code: &str) -> Option<Self> {
        match code {
            "email_verification" => Some(Self::EmailVerification),
            "password_reset" => Some(Self::PasswordReset),
            "magic_link" => Some(Self::MagicLink),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use account token
#[derive(Debug, Clone)]
pub struct AccountToken {
    pub token_id: Uuid,
    pub kind: TokenKind,
    /// Email the token was issued for
    pub email: Email,
    /// Random mixed-case alphanumeric secret
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccountToken {
    /// Issue a fresh token of the given kind
    pub fn issue(kind: TokenKind, email: Email, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            kind,
            email,
            token: random_token(TOKEN_LENGTH),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    /// Check expiry as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
