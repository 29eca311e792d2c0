//! Infrastructure Layer
//!
//! PostgreSQL and Redis implementations, mail delivery.

pub mod mailer;
pub mod postgres;
pub mod redis;

pub use mailer::{Mailer, TracingMailer};
pub use postgres::PgAuthRepository;
pub use redis::{RedisPool, RedisRateLimitStore};
