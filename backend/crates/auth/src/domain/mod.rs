//! Domain Layer
//!
//! Entities, value objects, repository traits and domain heuristics.

pub mod entity;
pub mod repository;
pub mod suspicion;
pub mod value_object;

// Re-exports
pub use entity::{
    account_token::AccountToken, credential::Credential, security_event::SecurityEvent, user::User,
};
pub use repository::{
    AuthStore, CredentialRepository, SecurityEventRepository, TokenRepository, UserRepository,
};
