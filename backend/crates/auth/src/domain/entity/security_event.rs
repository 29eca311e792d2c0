//! Security Event Entity
//!
//! Append-only audit record for authentication-relevant actions. Events
//! are never mutated or deleted; they are the sole input for the
//! suspicious-activity heuristic and the admin back-office view.

use chrono::{DateTime, Utc};
use platform::client::ClientInfo;
use uuid::Uuid;

use crate::domain::value_object::user_id::UserId;

/// Closed vocabulary of security event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventKind {
    SignUp,
    LoginSuccess,
    LoginFailed,
    AccountLocked,
    SignOut,
    MagicLinkRequested,
    MagicLinkUsed,
    OauthLogin,
    EmailVerificationRequested,
    EmailVerified,
    PasswordResetRequested,
    PasswordResetCompleted,
    RateLimitExceeded,
    SuspiciousActivity,
}

impl SecurityEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignUp => "sign_up",
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::AccountLocked => "account_locked",
            Self::SignOut => "sign_out",
            Self::MagicLinkRequested => "magic_link_requested",
            Self::MagicLinkUsed => "magic_link_used",
            Self::OauthLogin => "oauth_login",
            Self::EmailVerificationRequested => "email_verification_requested",
            Self::EmailVerified => "email_verified",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordResetCompleted => "password_reset_completed",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::SuspiciousActivity => "suspicious_activity",
        }
    }

    pub fn from_str(code: &str) -> Option<Self> {
        match code {
            "sign_up" => Some(Self::SignUp),
            "login_success" => Some(Self::LoginSuccess),
            "login_failed" => Some(Self::LoginFailed),
            "account_locked" => Some(Self::AccountLocked),
            "sign_out" => Some(Self::SignOut),
            "magic_link_requested" => Some(Self::MagicLinkRequested),
            "magic_link_used" => Some(Self::MagicLinkUsed),
            "oauth_login" => Some(Self::OauthLogin),
            "email_verification_requested" => Some(Self::EmailVerificationRequested),
            "email_verified" => Some(Self::EmailVerified),
            "password_reset_requested" => Some(Self::PasswordResetRequested),
            "password_reset_completed" => Some(Self::PasswordResetCompleted),
            "rate_limit_exceeded" => Some(Self::RateLimitExceeded),
            "suspicious_activity" => Some(Self::SuspiciousActivity),
            _ => None,
        }
    }
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security event entity
#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    /// Subject account, when known (failed lookups have none)
    pub user_id: Option<UserId>,
    pub kind: SecurityEventKind,
    /// Free-form context (outcome reason, counters, suspicion signals)
    pub details: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SecurityEvent {
    /// Create a new event from the current request's client context
    pub fn new(
        kind: SecurityEventKind,
        user_id: Option<UserId>,
        details: serde_json::Value,
        client: &ClientInfo,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            user_id,
            kind,
            details,
            ip: client.ip_string(),
            user_agent: client.user_agent.clone(),
            created_at: Utc::now(),
        }
    }
}
