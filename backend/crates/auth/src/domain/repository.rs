//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entity::{
    account_token::{AccountToken, TokenKind},
    credential::{Credential, LockoutOutcome},
    security_event::{SecurityEvent, SecurityEventKind},
    user::User,
};
use crate::domain::value_object::{email::Email, public_id::PublicId, user_id::UserId};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Find user by public ID
    async fn find_by_public_id(&self, public_id: &PublicId) -> AuthResult<Option<User>>;

    /// Find user by normalized email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Check if an email is taken
    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// Update user
    async fn update(&self, user: &User) -> AuthResult<()>;
}

/// Credential repository trait
///
/// Method names are entity-qualified because production backs every trait
/// in this module with one repository type.
#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    /// Create a password credential
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()>;

    /// Find credential by user ID
    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>>;

    /// Record a failed sign-in attempt and apply the lockout transition.
    ///
    /// Must increment and lock in one atomic operation per user:
    /// concurrent failures may never observe the same counter value, so N
    /// simultaneous failures always count N.
    async fn record_failed_attempt(
        &self,
        user_id: &UserId,
        max_attempts: u32,
        lockout: Duration,
    ) -> AuthResult<LockoutOutcome>;

    /// Clear failure count and lock fields (successful sign-in, expired
    /// lockout, completed password reset)
    async fn reset_lockout(&self, user_id: &UserId) -> AuthResult<()>;

    /// Replace the password hash, creating the credential row if the
    /// account was OAuth-only, and clear lockout state
    async fn update_password(&self, user_id: &UserId, password_hash: &str) -> AuthResult<()>;
}

/// Security event repository trait
///
/// The event log is append-only: no update or delete operations exist.
#[trait_variant::make(SecurityEventRepository: Send)]
pub trait LocalSecurityEventRepository {
    /// Append an event
    async fn append(&self, event: &SecurityEvent) -> AuthResult<()>;

    /// Count events of a kind for a user since the given instant
    async fn count_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64>;

    /// Count distinct source IPs of a kind for a user since the given
    /// instant
    async fn distinct_ips_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64>;

    /// Most recent events for a user, newest first
    async fn recent_for_user(&self, user_id: &UserId, limit: i64)
    -> AuthResult<Vec<SecurityEvent>>;
}

/// Account token repository trait
#[trait_variant::make(TokenRepository: Send)]
pub trait LocalTokenRepository {
    /// Store a freshly issued token
    async fn store_token(&self, token: &AccountToken) -> AuthResult<()>;

    /// Delete all tokens of a kind for an email; returns the number
    /// removed. Called before issuing so only the newest token is valid.
    async fn delete_tokens_for_email(&self, kind: TokenKind, email: &Email) -> AuthResult<u64>;

    /// Atomically consume a token: remove it and return it if it existed.
    /// Expiry is checked by the caller; a consumed token is gone either
    /// way (single use).
    async fn consume_token(&self, kind: TokenKind, token: &str)
    -> AuthResult<Option<AccountToken>>;

    /// Remove expired tokens (startup housekeeping)
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Everything the account-security use cases need from one store.
///
/// Blanket-implemented so a single repository type (PostgreSQL in
/// production, in-memory in tests) can back all of them.
pub trait AuthStore:
    UserRepository
    + CredentialRepository
    + SecurityEventRepository
    + TokenRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + CredentialRepository
        + SecurityEventRepository
        + TokenRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
