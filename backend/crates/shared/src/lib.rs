//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by every
//! backend crate:
//! - Unified error types and result aliases
//! - Common primitive value objects (typed IDs)
//!
//! **Design Principle**: only include things that are "hard to change"
//! and have a consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
