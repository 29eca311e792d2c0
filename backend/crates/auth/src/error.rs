//! Auth Error Types
//!
//! Account-security error variants that integrate with the unified
//! `kernel::error::AppError` system.
//!
//! Enumeration policy note: unknown email and wrong password both surface
//! [`AuthError::InvalidCredentials`] with the same generic message, while
//! locked / unverified / inactive accounts are disclosed explicitly. That
//! asymmetry is deliberate and matches the product's observed behavior.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password (intentionally indistinguishable)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Account is locked after repeated failures
    #[error("Account is temporarily locked due to too many failed sign-in attempts")]
    AccountLocked,

    /// Email address not yet verified
    #[error("Email address has not been verified")]
    EmailNotVerified,

    /// Account is suspended or closed
    #[error("Account is not active")]
    AccountInactive,

    /// Too many attempts from this address
    #[error("Too many attempts, please try again later")]
    RateLimited,

    /// Email already registered
    #[error("An account with this email already exists")]
    EmailTaken,

    /// Unknown or already-used token
    #[error("Token is invalid or has already been used")]
    TokenInvalid,

    /// Token past its expiry
    #[error("Token has expired")]
    TokenExpired,

    /// Session cookie missing, malformed or expired
    #[error("Session is invalid or expired")]
    SessionInvalid,

    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// OAuth state missing, mismatched or expired
    #[error("OAuth handshake state is invalid or expired")]
    OAuthState,

    /// OAuth code exchange or userinfo fetch failed
    #[error("OAuth provider error: {0}")]
    OAuthProvider(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cache store error
    #[error("Cache store error: {0}")]
    Cache(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials | AuthError::TokenInvalid | AuthError::SessionInvalid => {
                ErrorKind::Unauthorized
            }
            AuthError::AccountLocked => ErrorKind::Locked,
            AuthError::EmailNotVerified | AuthError::AccountInactive => ErrorKind::Forbidden,
            AuthError::RateLimited => ErrorKind::TooManyRequests,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::TokenExpired => ErrorKind::Gone,
            AuthError::Validation(_) | AuthError::OAuthState => ErrorKind::BadRequest,
            AuthError::Cache(_) => ErrorKind::ServiceUnavailable,
            AuthError::OAuthProvider(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Log the error with an appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Cache(msg) => {
                tracing::error!(message = %msg, "Auth cache store error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::OAuthProvider(msg) => {
                tracing::error!(message = %msg, "OAuth provider error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid sign-in attempt");
            }
            AuthError::AccountLocked => {
                tracing::warn!("Sign-in attempt on locked account");
            }
            AuthError::RateLimited => {
                tracing::warn!("Rate-limited request rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        if err.is_client_error() {
            AuthError::Validation(err.message().to_string())
        } else {
            AuthError::Internal(err.to_string())
        }
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
