//! Unit tests for the auth crate
//!
//! Use-case tests run against in-memory repository implementations so the
//! full sign-in / lockout / token flows are exercised without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::rate_limit::{RateLimitAction, RateLimiter};
use crate::application::session::SessionTokenService;
use crate::domain::entity::account_token::{AccountToken, TokenKind};
use crate::domain::entity::credential::{Credential, LockoutOutcome};
use crate::domain::entity::security_event::{SecurityEvent, SecurityEventKind};
use crate::domain::entity::user::User;
use crate::domain::repository::{
    CredentialRepository, SecurityEventRepository, TokenRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email,
    public_id::PublicId,
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
    user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};
use crate::infra::mailer::Mailer;
use platform::client::ClientInfo;
use platform::rate_limit::{RateLimitConfig, RateLimitResult, RateLimitStore};

// ============================================================================
// In-memory doubles
// ============================================================================

#[derive(Clone, Default)]
struct MemStore {
    inner: Arc<Mutex<MemInner>>,
}

#[derive(Default)]
struct MemInner {
    users: HashMap<Uuid, User>,
    credentials: HashMap<Uuid, Credential>,
    events: Vec<SecurityEvent>,
    tokens: Vec<AccountToken>,
}

impl MemStore {
    fn credential(&self, user_id: &UserId) -> Option<Credential> {
        self.inner
            .lock()
            .unwrap()
            .credentials
            .get(user_id.as_uuid())
            .cloned()
    }

    fn with_credential_mut(&self, user_id: &UserId, f: impl FnOnce(&mut Credential)) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(credential) = inner.credentials.get_mut(user_id.as_uuid()) {
            f(credential);
        }
    }

    fn events(&self) -> Vec<SecurityEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    fn tokens(&self) -> Vec<AccountToken> {
        self.inner.lock().unwrap().tokens.clone()
    }

    fn user(&self, user_id: &UserId) -> Option<User> {
        self.inner.lock().unwrap().users.get(user_id.as_uuid()).cloned()
    }
}

impl UserRepository for MemStore {
    async fn create(&self, user: &User) -> AuthResult<()> {
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(*user.user_id.as_uuid(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(user_id.as_uuid()).cloned())
    }

    async fn find_by_public_id(&self, public_id: &PublicId) -> AuthResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.public_id.as_str() == public_id.as_str())
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .any(|u| u.email == *email))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(*user.user_id.as_uuid(), user.clone());
        Ok(())
    }
}

impl CredentialRepository for MemStore {
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()> {
        self.inner
            .lock()
            .unwrap()
            .credentials
            .insert(*credential.user_id.as_uuid(), credential.clone());
        Ok(())
    }

    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .credentials
            .get(user_id.as_uuid())
            .cloned())
    }

    async fn record_failed_attempt(
        &self,
        user_id: &UserId,
        max_attempts: u32,
        lockout: ChronoDuration,
    ) -> AuthResult<LockoutOutcome> {
        // Increment under the lock, mirroring the single-statement SQL
        // update: concurrent callers never observe the same counter
        let mut inner = self.inner.lock().unwrap();
        let credential = inner
            .credentials
            .get_mut(user_id.as_uuid())
            .ok_or_else(|| AuthError::Internal("Credential row missing".to_string()))?;

        Ok(credential.record_failure(Utc::now(), max_attempts, lockout))
    }

    async fn reset_lockout(&self, user_id: &UserId) -> AuthResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(credential) = inner.credentials.get_mut(user_id.as_uuid()) {
            credential.reset_failures(Utc::now());
        }
        Ok(())
    }

    async fn update_password(&self, user_id: &UserId, password_hash: &str) -> AuthResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.credentials.get_mut(user_id.as_uuid()) {
            Some(credential) => {
                credential.update_password(UserPassword::from_db(password_hash.to_string()));
            }
            None => {
                inner.credentials.insert(
                    *user_id.as_uuid(),
                    Credential::new(*user_id, UserPassword::from_db(password_hash.to_string())),
                );
            }
        }
        Ok(())
    }
}

impl SecurityEventRepository for MemStore {
    async fn append(&self, event: &SecurityEvent) -> AuthResult<()> {
        self.inner.lock().unwrap().events.push(event.clone());
        Ok(())
    }

    async fn count_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| {
                e.user_id.as_ref().map(|id| id.as_uuid()) == Some(user_id.as_uuid())
                    && e.kind == kind
                    && e.created_at >= since
            })
            .count() as i64)
    }

    async fn distinct_ips_for_user(
        &self,
        user_id: &UserId,
        kind: SecurityEventKind,
        since: DateTime<Utc>,
    ) -> AuthResult<i64> {
        let inner = self.inner.lock().unwrap();
        let ips: HashSet<&String> = inner
            .events
            .iter()
            .filter(|e| {
                e.user_id.as_ref().map(|id| id.as_uuid()) == Some(user_id.as_uuid())
                    && e.kind == kind
                    && e.created_at >= since
            })
            .filter_map(|e| e.ip.as_ref())
            .collect();
        Ok(ips.len() as i64)
    }

    async fn recent_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> AuthResult<Vec<SecurityEvent>> {
        let mut events: Vec<SecurityEvent> = self
            .inner
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.user_id.as_ref().map(|id| id.as_uuid()) == Some(user_id.as_uuid()))
            .cloned()
            .collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        events.truncate(limit as usize);
        Ok(events)
    }
}

impl TokenRepository for MemStore {
    async fn store_token(&self, token: &AccountToken) -> AuthResult<()> {
        self.inner.lock().unwrap().tokens.push(token.clone());
        Ok(())
    }

    async fn delete_tokens_for_email(&self, kind: TokenKind, email: &Email) -> AuthResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner
            .tokens
            .retain(|t| !(t.kind == kind && t.email == *email));
        Ok((before - inner.tokens.len()) as u64)
    }

    async fn consume_token(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> AuthResult<Option<AccountToken>> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner
            .tokens
            .iter()
            .position(|t| t.kind == kind && t.token == token);
        Ok(pos.map(|p| inner.tokens.remove(p)))
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner.tokens.retain(|t| t.expires_at >= now);
        Ok((before - inner.tokens.len()) as u64)
    }
}

/// Fixed-window counter in memory
#[derive(Clone, Default)]
struct MemRateLimitStore {
    inner: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
}

impl RateLimitStore for MemRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        let mut map = self.inner.lock().unwrap();
        let now = Instant::now();

        let entry = map
            .entry(key.to_string())
            .or_insert((0, now + config.window));
        if now >= entry.1 {
            *entry = (0, now + config.window);
        }
        entry.0 += 1;

        Ok(RateLimitResult {
            allowed: entry.0 <= config.max_attempts,
            remaining: config.max_attempts.saturating_sub(entry.0),
            reset_at_ms: Utc::now().timestamp_millis() + config.window_ms(),
        })
    }
}

/// Store that is always unreachable
#[derive(Clone, Default)]
struct FailingRateLimitStore;

impl RateLimitStore for FailingRateLimitStore {
    async fn check_and_increment(
        &self,
        _key: &str,
        _config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Err("store unreachable".into())
    }
}

/// Captures outbound mail instead of sending it
#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    async fn send_email_verification(&self, email: &Email, link: &str) -> AuthResult<()> {
        self.sent.lock().unwrap().push((
            "verification".to_string(),
            email.to_string(),
            link.to_string(),
        ));
        Ok(())
    }

    async fn send_magic_link(&self, email: &Email, link: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push(("magic_link".to_string(), email.to_string(), link.to_string()));
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email, link: &str) -> AuthResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push(("reset".to_string(), email.to_string(), link.to_string()));
        Ok(())
    }
}

// ============================================================================
// Test fixtures
// ============================================================================

const PASSWORD: &str = "a sturdy passphrase";

fn test_config() -> AuthConfig {
    let mut config = AuthConfig::with_random_secret();
    config.cookie_secure = false;
    // Keep per-IP limiting out of the way unless a test opts in
    config.rate_limit = RateLimitConfig::new(1000, std::time::Duration::from_secs(900));
    config
}

fn test_sessions(config: &AuthConfig) -> Arc<SessionTokenService> {
    Arc::new(SessionTokenService::new(
        &config.session_secret,
        config.session_ttl,
    ))
}

fn test_client() -> ClientInfo {
    ClientInfo {
        ip: Some("10.1.2.3".parse().unwrap()),
        user_agent: Some("test-agent/1.0".to_string()),
    }
}

async fn seed_user(
    store: &MemStore,
    config: &AuthConfig,
    email: &str,
    verified: bool,
) -> User {
    let mut user = User::new(
        Email::new(email).unwrap(),
        Some("Test Account".to_string()),
        UserRole::Customer,
    );
    if verified {
        user.email_verified = true;
    }
    // Backdate creation so the new-account suspicion signal stays quiet
    user.created_at = Utc::now() - ChronoDuration::days(30);

    let raw = RawPassword::new(PASSWORD.to_string()).unwrap();
    let hash = UserPassword::from_raw(&raw, config.pepper()).unwrap();
    let credential = Credential::new(user.user_id, hash);

    UserRepository::create(store, &user).await.unwrap();
    store.create_credential(&credential).await.unwrap();
    user
}

fn sign_in_use_case(
    store: &MemStore,
    config: &AuthConfig,
) -> crate::application::SignInUseCase<MemStore, MemRateLimitStore> {
    crate::application::SignInUseCase::new(
        Arc::new(store.clone()),
        Arc::new(MemRateLimitStore::default()),
        test_sessions(config),
        Arc::new(config.clone()),
    )
}

fn sign_in_input(email: &str, password: &str) -> crate::application::SignInInput {
    crate::application::SignInInput {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn event_kinds(store: &MemStore) -> Vec<SecurityEventKind> {
    store.events().iter().map(|e| e.kind).collect()
}

// ============================================================================
// Credential entity (lockout state machine)
// ============================================================================

mod credential_tests {
    use super::*;

    fn credential() -> Credential {
        Credential::new(UserId::new(), UserPassword::from_db("$argon2id$test".into()))
    }

    #[test]
    fn test_failures_accumulate_until_threshold() {
        let mut credential = credential();
        let now = Utc::now();
        let lockout = ChronoDuration::minutes(15);

        for expected in 1..=4u32 {
            let outcome = credential.record_failure(now, 5, lockout);
            assert_eq!(outcome.failed_attempts, expected);
            assert!(!outcome.locked);
            assert!(!credential.is_locked(now));
        }

        let outcome = credential.record_failure(now, 5, lockout);
        assert_eq!(outcome.failed_attempts, 5);
        assert!(outcome.locked);
        assert!(credential.is_locked(now));

        // Expiry lands the configured window ahead
        let until = outcome.locked_until.unwrap();
        assert_eq!(until, now + lockout);
    }

    #[test]
    fn test_lock_observed_lazily() {
        let mut credential = credential();
        let now = Utc::now();
        credential.record_failure(now, 1, ChronoDuration::minutes(15));

        assert!(credential.is_locked(now));
        assert!(!credential.lock_expired(now));

        let later = now + ChronoDuration::minutes(16);
        assert!(!credential.is_locked(later));
        assert!(credential.lock_expired(later));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut credential = credential();
        let now = Utc::now();
        credential.record_failure(now, 1, ChronoDuration::minutes(15));

        credential.reset_failures(now);
        assert_eq!(credential.failed_attempts, 0);
        assert!(!credential.locked);
        assert!(credential.locked_until.is_none());
        assert!(credential.last_failed_at.is_none());
    }

    #[test]
    fn test_update_password_clears_lockout() {
        let mut credential = credential();
        let now = Utc::now();
        credential.record_failure(now, 1, ChronoDuration::minutes(15));

        credential.update_password(UserPassword::from_db("$argon2id$other".into()));
        assert_eq!(credential.failed_attempts, 0);
        assert!(!credential.locked);
        assert_eq!(credential.password_hash.as_str(), "$argon2id$other");
    }
}

// ============================================================================
// Suspicion heuristic
// ============================================================================

mod suspicion_tests {
    use crate::domain::suspicion::{ActivitySummary, SuspicionReason, evaluate};
    use chrono::Duration;

    fn quiet() -> ActivitySummary {
        ActivitySummary {
            failed_logins: 0,
            distinct_login_ips: 1,
            account_age: Duration::days(90),
        }
    }

    #[test]
    fn test_no_signals() {
        assert!(evaluate(&quiet()).is_empty());
    }

    #[test]
    fn test_repeated_failures_signal() {
        let summary = ActivitySummary {
            failed_logins: 3,
            ..quiet()
        };
        assert_eq!(evaluate(&summary), vec![SuspicionReason::RepeatedFailures]);

        let below = ActivitySummary {
            failed_logins: 2,
            ..quiet()
        };
        assert!(evaluate(&below).is_empty());
    }

    #[test]
    fn test_many_ips_signal() {
        let summary = ActivitySummary {
            distinct_login_ips: 4,
            ..quiet()
        };
        assert_eq!(evaluate(&summary), vec![SuspicionReason::ManyIps]);

        // Exactly the threshold does not trigger
        let at_threshold = ActivitySummary {
            distinct_login_ips: 3,
            ..quiet()
        };
        assert!(evaluate(&at_threshold).is_empty());
    }

    #[test]
    fn test_new_account_signal() {
        let summary = ActivitySummary {
            account_age: Duration::hours(2),
            ..quiet()
        };
        assert_eq!(evaluate(&summary), vec![SuspicionReason::NewAccount]);
    }

    #[test]
    fn test_union_of_signals() {
        let summary = ActivitySummary {
            failed_logins: 10,
            distinct_login_ips: 5,
            account_age: Duration::minutes(5),
        };
        let reasons = evaluate(&summary);
        assert_eq!(reasons.len(), 3);
    }
}

// ============================================================================
// Account tokens
// ============================================================================

mod account_token_tests {
    use super::*;

    #[test]
    fn test_issue_token_shape() {
        let token = AccountToken::issue(
            TokenKind::PasswordReset,
            Email::new("user@example.com").unwrap(),
            ChronoDuration::hours(1),
        );

        assert_eq!(token.token.len(), 32);
        assert!(token.token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!token.is_expired(Utc::now()));
        assert!(token.is_expired(Utc::now() + ChronoDuration::hours(2)));
    }

    #[test]
    fn test_tokens_are_unique() {
        let email = Email::new("user@example.com").unwrap();
        let a = AccountToken::issue(TokenKind::MagicLink, email.clone(), ChronoDuration::hours(1));
        let b = AccountToken::issue(TokenKind::MagicLink, email, ChronoDuration::hours(1));
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_kind_codes_roundtrip() {
        for kind in [
            TokenKind::EmailVerification,
            TokenKind::PasswordReset,
            TokenKind::MagicLink,
        ] {
            assert_eq!(TokenKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(TokenKind::from_str("reset_abc"), None);
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod config_tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();

        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(config.lockout_duration, std::time::Duration::from_secs(900));
        assert_eq!(config.rate_limit.max_attempts, 10);
        assert_eq!(config.rate_limit.window, std::time::Duration::from_secs(900));
        assert_eq!(
            config.session_ttl,
            std::time::Duration::from_secs(30 * 24 * 3600)
        );
        assert_eq!(
            config.verification_token_ttl,
            std::time::Duration::from_secs(24 * 3600)
        );
        assert_eq!(config.reset_token_ttl, std::time::Duration::from_secs(3600));
        assert!(config.cookie_secure);
        assert!(config.oauth.is_none());
    }

    #[test]
    fn test_with_random_secret() {
        let a = AuthConfig::with_random_secret();
        let b = AuthConfig::with_random_secret();
        assert_ne!(a.session_secret, b.session_secret);
        assert!(a.session_secret.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_development_config() {
        let config = AuthConfig::development();
        assert!(!config.cookie_secure);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        // SAFETY: serialized test, no concurrent env access
        unsafe {
            std::env::set_var("AUTH_MAX_FAILED_ATTEMPTS", "3");
            std::env::set_var("AUTH_LOCKOUT_DURATION_MS", "60000");
            std::env::set_var("RATE_LIMIT_MAX_ATTEMPTS", "7");
            std::env::set_var("RATE_LIMIT_WINDOW_MS", "120000");
        }

        let config = AuthConfig::from_env();
        assert_eq!(config.max_failed_attempts, 3);
        assert_eq!(config.lockout_duration, std::time::Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_attempts, 7);
        assert_eq!(config.rate_limit.window, std::time::Duration::from_secs(120));

        unsafe {
            std::env::remove_var("AUTH_MAX_FAILED_ATTEMPTS");
            std::env::remove_var("AUTH_LOCKOUT_DURATION_MS");
            std::env::remove_var("RATE_LIMIT_MAX_ATTEMPTS");
            std::env::remove_var("RATE_LIMIT_WINDOW_MS");
        }
    }

    #[test]
    #[serial]
    fn test_env_fallbacks_on_garbage() {
        unsafe {
            std::env::set_var("AUTH_MAX_FAILED_ATTEMPTS", "not-a-number");
        }

        let config = AuthConfig::from_env();
        assert_eq!(config.max_failed_attempts, 5);

        unsafe {
            std::env::remove_var("AUTH_MAX_FAILED_ATTEMPTS");
        }
    }
}

// ============================================================================
// Session tokens
// ============================================================================

mod session_tests {
    use super::*;

    fn sample_user() -> User {
        let mut user = User::new(
            Email::new("seller@example.com").unwrap(),
            Some("Seller".to_string()),
            UserRole::Vendor,
        );
        user.email_verified = true;
        user
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let config = AuthConfig::with_random_secret();
        let service = SessionTokenService::new(
            &config.session_secret,
            std::time::Duration::from_secs(3600),
        );

        let user = sample_user();
        let token = service.issue(&user).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user.public_id.to_string());
        assert_eq!(claims.role, "vendor");
        assert_eq!(claims.role(), UserRole::Vendor);
        assert!(claims.email_verified);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = AuthConfig::with_random_secret();
        let b = AuthConfig::with_random_secret();

        let issuer =
            SessionTokenService::new(&a.session_secret, std::time::Duration::from_secs(3600));
        let verifier =
            SessionTokenService::new(&b.session_secret, std::time::Duration::from_secs(3600));

        let token = issuer.issue(&sample_user()).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::SessionInvalid)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let config = AuthConfig::with_random_secret();
        let service = SessionTokenService::new(
            &config.session_secret,
            std::time::Duration::from_secs(3600),
        );

        let mut token = service.issue(&sample_user()).unwrap();
        token.push('x');
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let config = AuthConfig::with_random_secret();
        let service =
            SessionTokenService::new(&config.session_secret, std::time::Duration::ZERO);

        let token = service.issue(&sample_user()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(matches!(
            service.verify(&token),
            Err(AuthError::SessionInvalid)
        ));
    }
}

// ============================================================================
// DTOs
// ============================================================================

mod dto_tests {
    use crate::presentation::dto::*;

    #[test]
    fn test_sign_in_provider_discriminator() {
        let json = r#"{"provider":"credentials","email":"a@b.co","password":"hunter2hunter2"}"#;
        let request: SignInRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(request, SignInRequest::Credentials { .. }));

        let json = r#"{"provider":"email","email":"a@b.co"}"#;
        let request: SignInRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(request, SignInRequest::Email { .. }));

        let json = r#"{"provider":"saml","email":"a@b.co"}"#;
        assert!(serde_json::from_str::<SignInRequest>(json).is_err());
    }

    #[test]
    fn test_sign_up_defaults_to_customer() {
        let json = r#"{"email":"a@b.co","password":"hunter2hunter2"}"#;
        let request: SignUpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.account_type, AccountType::Customer);

        let json = r#"{"email":"a@b.co","password":"hunter2hunter2","accountType":"vendor"}"#;
        let request: SignUpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.account_type, AccountType::Vendor);
    }

    #[test]
    fn test_responses_serialize_camel_case() {
        let response = SignInResponse {
            public_id: "abc".to_string(),
            role: "customer".to_string(),
            email_verified: true,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("publicId"));
        assert!(json.contains("emailVerified"));

        let status = SessionStatusResponse {
            authenticated: false,
            public_id: None,
            role: None,
            email_verified: None,
            expires_at_ms: None,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("expiresAtMs"));
    }
}

// ============================================================================
// Errors
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases: Vec<(AuthError, u16)> = vec![
            (AuthError::InvalidCredentials, 401),
            (AuthError::AccountLocked, 423),
            (AuthError::EmailNotVerified, 403),
            (AuthError::AccountInactive, 403),
            (AuthError::RateLimited, 429),
            (AuthError::EmailTaken, 409),
            (AuthError::TokenInvalid, 401),
            (AuthError::TokenExpired, 410),
            (AuthError::SessionInvalid, 401),
            (AuthError::Validation("bad".into()), 400),
            (AuthError::OAuthState, 400),
            (AuthError::Cache("down".into()), 503),
            (AuthError::Internal("boom".into()), 500),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_locked_message_mentions_lockout() {
        assert!(AuthError::AccountLocked.to_string().to_lowercase().contains("locked"));
    }

    #[test]
    fn test_generic_credentials_message() {
        // Unknown email and wrong password must be indistinguishable
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
    }
}

// ============================================================================
// Sign-in flow (in-memory store)
// ============================================================================

mod sign_in_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_sign_in_issues_session() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        let output = use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap();

        assert_eq!(output.public_id, user.public_id.to_string());
        assert!(!output.session_token.is_empty());

        // last_login_at stamped, success event appended
        assert!(store.user(&user.user_id).unwrap().last_login_at.is_some());
        assert!(event_kinds(&store).contains(&SecurityEventKind::LoginSuccess));
    }

    #[tokio::test]
    async fn test_email_is_normalized_before_lookup() {
        let store = MemStore::default();
        let config = test_config();
        seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        let output = use_case
            .execute(
                sign_in_input("  Buyer@Example.COM ", PASSWORD),
                &test_client(),
            )
            .await;

        assert!(output.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_email_is_generic() {
        let store = MemStore::default();
        let config = test_config();

        let use_case = sign_in_use_case(&store, &config);
        let err = use_case
            .execute(sign_in_input("ghost@example.com", PASSWORD), &test_client())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        // Failure still leaves an audit record (with no user attached)
        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::LoginFailed);
        assert!(events[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_unverified_email_disclosed_before_password_check() {
        let store = MemStore::default();
        let config = test_config();
        seed_user(&store, &config, "buyer@example.com", false).await;

        let use_case = sign_in_use_case(&store, &config);
        // Even a wrong password reports unverified, not invalid credentials
        let err = use_case
            .execute(
                sign_in_input("buyer@example.com", "definitely wrong pw"),
                &test_client(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::EmailNotVerified));
    }

    #[tokio::test]
    async fn test_inactive_account_rejected() {
        let store = MemStore::default();
        let config = test_config();
        let mut user = seed_user(&store, &config, "buyer@example.com", true).await;
        user.set_status(crate::domain::value_object::account_status::AccountStatus::Suspended);
        UserRepository::update(&store, &user).await.unwrap();

        let use_case = sign_in_use_case(&store, &config);
        let err = use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::AccountInactive));
    }

    #[tokio::test]
    async fn test_lockout_after_max_failures() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);

        // Four failures accumulate without locking
        for _ in 0..4 {
            let err = use_case
                .execute(
                    sign_in_input("buyer@example.com", "wrong password"),
                    &test_client(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        // The fifth wrong password locks and says so
        let err = use_case
            .execute(
                sign_in_input("buyer@example.com", "wrong password"),
                &test_client(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        let credential = store.credential(&user.user_id).unwrap();
        assert_eq!(credential.failed_attempts, 5);
        assert!(credential.locked);

        // Expiry sits roughly the configured window ahead
        let until = credential.locked_until.unwrap();
        let expected = Utc::now() + ChronoDuration::minutes(15);
        assert!((expected - until).num_seconds().abs() < 5);

        assert!(event_kinds(&store).contains(&SecurityEventKind::AccountLocked));
    }

    #[tokio::test]
    async fn test_correct_password_rejected_while_locked() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        for _ in 0..5 {
            let _ = use_case
                .execute(
                    sign_in_input("buyer@example.com", "wrong password"),
                    &test_client(),
                )
                .await;
        }

        let err = use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        // The rejected attempt does not advance the failure counter
        assert_eq!(store.credential(&user.user_id).unwrap().failed_attempts, 5);
    }

    #[tokio::test]
    async fn test_expired_lock_clears_on_next_check() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        // Locked, but the window has already passed
        store.with_credential_mut(&user.user_id, |credential| {
            credential.failed_attempts = 5;
            credential.locked = true;
            credential.locked_until = Some(Utc::now() - ChronoDuration::minutes(1));
        });

        let use_case = sign_in_use_case(&store, &config);
        let output = use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await;

        assert!(output.is_ok());
        let credential = store.credential(&user.user_id).unwrap();
        assert_eq!(credential.failed_attempts, 0);
        assert!(!credential.locked);
        assert!(credential.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        for _ in 0..3 {
            let _ = use_case
                .execute(
                    sign_in_input("buyer@example.com", "wrong password"),
                    &test_client(),
                )
                .await;
        }
        assert_eq!(store.credential(&user.user_id).unwrap().failed_attempts, 3);

        use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap();

        let credential = store.credential(&user.user_id).unwrap();
        assert_eq!(credential.failed_attempts, 0);
        assert!(credential.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_repeated_failures_flag_suspicion_on_success() {
        let store = MemStore::default();
        let config = test_config();
        seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        for _ in 0..3 {
            let _ = use_case
                .execute(
                    sign_in_input("buyer@example.com", "wrong password"),
                    &test_client(),
                )
                .await;
        }

        use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap();

        // Advisory only: sign-in succeeded, but the signal is on record
        let kinds = event_kinds(&store);
        assert!(kinds.contains(&SecurityEventKind::LoginSuccess));
        assert!(kinds.contains(&SecurityEventKind::SuspiciousActivity));

        let suspicious = store
            .events()
            .into_iter()
            .find(|e| e.kind == SecurityEventKind::SuspiciousActivity)
            .unwrap();
        assert!(
            suspicious.details["reasons"]
                .as_array()
                .unwrap()
                .iter()
                .any(|r| r == "repeated_failures")
        );
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_over_cap() {
        let store = MemStore::default();
        let mut config = test_config();
        config.rate_limit = RateLimitConfig::new(2, std::time::Duration::from_secs(900));
        seed_user(&store, &config, "buyer@example.com", true).await;

        let use_case = sign_in_use_case(&store, &config);
        for _ in 0..2 {
            let _ = use_case
                .execute(
                    sign_in_input("buyer@example.com", "wrong password"),
                    &test_client(),
                )
                .await;
        }

        // Third attempt from the same IP is refused before any checks
        let err = use_case
            .execute(sign_in_input("buyer@example.com", PASSWORD), &test_client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));
        assert!(event_kinds(&store).contains(&SecurityEventKind::RateLimitExceeded));
    }
}

// ============================================================================
// Concurrency regression: atomic failure counting
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_simultaneous_failures_all_count() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        const TASKS: u32 = 32;
        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let store = store.clone();
            let user_id = user.user_id;
            handles.push(tokio::spawn(async move {
                store
                    .record_failed_attempt(&user_id, 1000, ChronoDuration::minutes(15))
                    .await
                    .unwrap()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            // Every caller observed a distinct counter value
            assert!(seen.insert(outcome.failed_attempts));
        }

        assert_eq!(store.credential(&user.user_id).unwrap().failed_attempts, TASKS);
    }

    #[tokio::test]
    async fn test_exactly_one_attempt_triggers_the_lock() {
        let store = MemStore::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        const TASKS: u32 = 8;
        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let store = store.clone();
            let user_id = user.user_id;
            handles.push(tokio::spawn(async move {
                store
                    .record_failed_attempt(&user_id, 5, ChronoDuration::minutes(15))
                    .await
                    .unwrap()
            }));
        }

        let mut crossings = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            if outcome.failed_attempts == 5 {
                assert!(outcome.locked);
                crossings += 1;
            }
        }
        assert_eq!(crossings, 1);
    }
}

// ============================================================================
// Rate limiter
// ============================================================================

mod rate_limiter_tests {
    use super::*;

    #[tokio::test]
    async fn test_window_cap_enforced() {
        let store = Arc::new(MemRateLimitStore::default());
        let config = RateLimitConfig::new(3, std::time::Duration::from_secs(60));
        let limiter = RateLimiter::new(store, config);
        let client = test_client();

        for i in 0..3 {
            let result = limiter.check(RateLimitAction::SignIn, &client).await;
            assert!(result.allowed, "attempt {} should pass", i);
        }

        let result = limiter.check(RateLimitAction::SignIn, &client).await;
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[tokio::test]
    async fn test_actions_and_ips_use_separate_buckets() {
        let store = Arc::new(MemRateLimitStore::default());
        let config = RateLimitConfig::new(1, std::time::Duration::from_secs(60));
        let limiter = RateLimiter::new(store, config);

        let client_a = test_client();
        let client_b = ClientInfo {
            ip: Some("10.9.9.9".parse().unwrap()),
            user_agent: None,
        };

        assert!(limiter.check(RateLimitAction::SignIn, &client_a).await.allowed);
        assert!(!limiter.check(RateLimitAction::SignIn, &client_a).await.allowed);

        // Different action, same IP: fresh bucket
        assert!(limiter.check(RateLimitAction::SignUp, &client_a).await.allowed);
        // Same action, different IP: fresh bucket
        assert!(limiter.check(RateLimitAction::SignIn, &client_b).await.allowed);
    }

    #[tokio::test]
    async fn test_counter_resets_after_window() {
        let store = Arc::new(MemRateLimitStore::default());
        let config = RateLimitConfig::new(1, std::time::Duration::from_millis(50));
        let limiter = RateLimiter::new(store, config);
        let client = test_client();

        assert!(limiter.check(RateLimitAction::SignIn, &client).await.allowed);
        assert!(!limiter.check(RateLimitAction::SignIn, &client).await.allowed);

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        assert!(limiter.check(RateLimitAction::SignIn, &client).await.allowed);
    }

    #[tokio::test]
    async fn test_fails_open_when_store_unreachable() {
        let limiter = RateLimiter::new(
            Arc::new(FailingRateLimitStore),
            RateLimitConfig::new(1, std::time::Duration::from_secs(60)),
        );
        let client = test_client();

        // Every attempt passes; the error is logged, not surfaced
        for _ in 0..5 {
            let result = limiter.check(RateLimitAction::SignIn, &client).await;
            assert!(result.allowed);
        }
    }
}

// ============================================================================
// Signup and token flows
// ============================================================================

mod token_flow_tests {
    use super::*;
    use crate::application::{
        MagicLinkUseCase, PasswordResetUseCase, SignUpInput, SignUpUseCase, VerifyEmailUseCase,
    };

    fn sign_up_use_case(
        store: &MemStore,
        mailer: &RecordingMailer,
        config: &AuthConfig,
    ) -> SignUpUseCase<MemStore, MemRateLimitStore, RecordingMailer> {
        SignUpUseCase::new(
            Arc::new(store.clone()),
            Arc::new(MemRateLimitStore::default()),
            Arc::new(mailer.clone()),
            Arc::new(config.clone()),
        )
    }

    fn sign_up_input(email: &str) -> SignUpInput {
        SignUpInput {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            display_name: Some("New Seller".to_string()),
            role: UserRole::Vendor,
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_account_and_verification_token() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();

        let output = sign_up_use_case(&store, &mailer, &config)
            .execute(sign_up_input("seller@example.com"), &test_client())
            .await
            .unwrap();
        assert!(!output.public_id.is_empty());

        let email = Email::new("seller@example.com").unwrap();
        let user = UserRepository::find_by_email(&store, &email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.role, UserRole::Vendor);
        assert!(!user.email_verified);
        assert!(store.credential(&user.user_id).is_some());

        let tokens = store.tokens();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EmailVerification);

        // The mailed link carries the token
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].2.contains(&tokens[0].token));

        assert!(event_kinds(&store).contains(&SecurityEventKind::SignUp));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_duplicate_email() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();

        let use_case = sign_up_use_case(&store, &mailer, &config);
        use_case
            .execute(sign_up_input("seller@example.com"), &test_client())
            .await
            .unwrap();

        let err = use_case
            .execute(sign_up_input("Seller@Example.com"), &test_client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn test_verify_email_confirm_flips_flag() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();

        sign_up_use_case(&store, &mailer, &config)
            .execute(sign_up_input("seller@example.com"), &test_client())
            .await
            .unwrap();
        let token = store.tokens()[0].token.clone();

        let verify = VerifyEmailUseCase::new(
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            Arc::new(config.clone()),
        );
        verify.confirm(&token, &test_client()).await.unwrap();

        let email = Email::new("seller@example.com").unwrap();
        let user = UserRepository::find_by_email(&store, &email)
            .await
            .unwrap()
            .unwrap();
        assert!(user.email_verified);

        // Single use: the same token is gone now
        let err = verify.confirm(&token, &test_client()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_and_consumed() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();
        seed_user(&store, &config, "seller@example.com", false).await;

        let stale = AccountToken {
            token_id: Uuid::new_v4(),
            kind: TokenKind::EmailVerification,
            email: Email::new("seller@example.com").unwrap(),
            token: "StaleToken0000000000000000000000".to_string(),
            expires_at: Utc::now() - ChronoDuration::hours(1),
            created_at: Utc::now() - ChronoDuration::hours(25),
        };
        store.store_token(&stale).await.unwrap();

        let verify = VerifyEmailUseCase::new(
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            Arc::new(config.clone()),
        );

        let err = verify.confirm(&stale.token, &test_client()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
        assert!(store.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_second_reset_request_invalidates_first_token() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();
        seed_user(&store, &config, "buyer@example.com", true).await;

        let reset = PasswordResetUseCase::new(
            Arc::new(store.clone()),
            Arc::new(MemRateLimitStore::default()),
            Arc::new(mailer.clone()),
            Arc::new(config.clone()),
        );

        reset.request("buyer@example.com", &test_client()).await.unwrap();
        let first = store.tokens()[0].token.clone();

        reset.request("buyer@example.com", &test_client()).await.unwrap();
        let tokens = store.tokens();
        assert_eq!(tokens.len(), 1);
        let second = tokens[0].token.clone();
        assert_ne!(first, second);

        // The superseded token no longer works
        let err = reset
            .confirm(&first, "a brand new passphrase".to_string(), &test_client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));

        // The current one does
        reset
            .confirm(&second, "a brand new passphrase".to_string(), &test_client())
            .await
            .unwrap();
        assert!(event_kinds(&store).contains(&SecurityEventKind::PasswordResetCompleted));
    }

    #[tokio::test]
    async fn test_reset_is_enumeration_safe_and_clears_lockout() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", true).await;

        let reset = PasswordResetUseCase::new(
            Arc::new(store.clone()),
            Arc::new(MemRateLimitStore::default()),
            Arc::new(mailer.clone()),
            Arc::new(config.clone()),
        );

        // Unknown email: same outcome, no token issued
        reset.request("ghost@example.com", &test_client()).await.unwrap();
        assert!(store.tokens().is_empty());

        // Lock the account, then reset the password through the token
        store.with_credential_mut(&user.user_id, |credential| {
            credential.failed_attempts = 5;
            credential.locked = true;
            credential.locked_until = Some(Utc::now() + ChronoDuration::minutes(10));
        });

        reset.request("buyer@example.com", &test_client()).await.unwrap();
        let token = store.tokens()[0].token.clone();
        reset
            .confirm(&token, "a brand new passphrase".to_string(), &test_client())
            .await
            .unwrap();

        let credential = store.credential(&user.user_id).unwrap();
        assert_eq!(credential.failed_attempts, 0);
        assert!(!credential.locked);
    }

    #[tokio::test]
    async fn test_magic_link_round_trip() {
        let store = MemStore::default();
        let mailer = RecordingMailer::default();
        let config = test_config();
        let user = seed_user(&store, &config, "buyer@example.com", false).await;

        let magic = MagicLinkUseCase::new(
            Arc::new(store.clone()),
            Arc::new(MemRateLimitStore::default()),
            Arc::new(mailer.clone()),
            test_sessions(&config),
            Arc::new(config.clone()),
        );

        // Unknown address: indistinguishable success, nothing issued
        magic.request("ghost@example.com", &test_client()).await.unwrap();
        assert!(store.tokens().is_empty());

        magic.request("buyer@example.com", &test_client()).await.unwrap();
        let token = store.tokens()[0].token.clone();

        let output = magic.verify(&token, &test_client()).await.unwrap();
        assert_eq!(output.public_id, user.public_id.to_string());
        assert!(!output.session_token.is_empty());

        // Following the link proved mailbox ownership
        assert!(store.user(&user.user_id).unwrap().email_verified);
        assert!(event_kinds(&store).contains(&SecurityEventKind::MagicLinkUsed));

        // Single use
        let err = magic.verify(&token, &test_client()).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }
}
