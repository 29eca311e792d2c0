//! Rate Limiter
//!
//! Applies the platform `RateLimitStore` per `(action, ip)` pair with a
//! failure-open policy: when the backing store is unreachable the check
//! logs the error and allows the request. Availability wins over
//! strictness here; lockout still protects individual accounts.

use std::sync::Arc;

use chrono::Utc;
use platform::client::ClientInfo;
use platform::rate_limit::{RateLimitConfig, RateLimitResult, RateLimitStore};

/// Actions rate-limited per source IP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    SignIn,
    SignUp,
    MagicLink,
    PasswordReset,
}

impl RateLimitAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
            Self::MagicLink => "magic_link",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-window rate limiter over a pluggable store
pub struct RateLimiter<S: RateLimitStore> {
    store: Arc<S>,
    config: RateLimitConfig,
}

impl<S: RateLimitStore> RateLimiter<S> {
    pub fn new(store: Arc<S>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Count this attempt and report whether it is allowed.
    ///
    /// Fails open on store errors.
    pub async fn check(&self, action: RateLimitAction, client: &ClientInfo) -> RateLimitResult {
        let key = format!("rate:{}:{}", action.as_str(), client.rate_limit_key());

        match self.store.check_and_increment(&key, &self.config).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    action = %action,
                    "Rate limit store unavailable, allowing request"
                );
                RateLimitResult::pass(&self.config, Utc::now().timestamp_millis())
            }
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
