//! Auth (Account Security) Backend Module
//!
//! Account-security subsystem of the marketplace backend, in a clean
//! architecture layout:
//! - `domain/` - Entities, value objects, repository traits, heuristics
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL / Redis implementations, mail delivery
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Signup with email + password (customer or vendor accounts)
//! - Sign-in providers: credentials, magic link, OAuth
//! - Email verification and password reset via single-use tokens
//! - Stateless 30-day JWT sessions in an HttpOnly cookie
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Automatic account lockout after repeated failed sign-ins,
//!   released lazily once the lockout window has passed
//! - Fixed-window per-IP rate limiting backed by Redis (fails open)
//! - Append-only security event log with an advisory
//!   suspicious-activity heuristic

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use infra::redis::RedisPool;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
