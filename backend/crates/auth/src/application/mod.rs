//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod events;
pub mod magic_link;
pub mod oauth;
pub mod password_reset;
pub mod rate_limit;
pub mod session;
pub mod sign_in;
pub mod sign_up;
pub mod verify_email;

// Re-exports
pub use config::AuthConfig;
pub use events::SecurityEventRecorder;
pub use magic_link::MagicLinkUseCase;
pub use oauth::OAuthUseCase;
pub use password_reset::PasswordResetUseCase;
pub use rate_limit::{RateLimitAction, RateLimiter};
pub use session::{SessionClaims, SessionTokenService};
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use verify_email::VerifyEmailUseCase;
