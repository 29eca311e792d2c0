//! Application Configuration
//!
//! All account-security tunables in one place, read from the environment
//! once at startup with hard-coded fallbacks.

use std::time::Duration;

use platform::rate_limit::RateLimitConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// OAuth provider settings (authorization-code + PKCE flow)
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_url: String,
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Secret key for signing session JWTs (32 bytes)
    pub session_secret: [u8; 32],
    /// Session/cookie lifetime (30 days)
    pub session_ttl: Duration,
    /// Whether to require the Secure cookie attribute
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Failed sign-ins before the account locks
    pub max_failed_attempts: u32,
    /// How long a locked account stays locked
    pub lockout_duration: Duration,
    /// Fixed-window rate limit applied per (action, ip)
    pub rate_limit: RateLimitConfig,
    /// Email verification token lifetime
    pub verification_token_ttl: Duration,
    /// Password reset token lifetime
    pub reset_token_ttl: Duration,
    /// Magic-link token lifetime
    pub magic_link_ttl: Duration,
    /// Base URL used when building emailed links
    pub base_url: String,
    /// OAuth provider, when configured
    pub oauth: Option<OAuthSettings>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "session_token".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(30 * 24 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            rate_limit: RateLimitConfig::default(),
            verification_token_ttl: Duration::from_secs(24 * 3600),
            reset_token_ttl: Duration::from_secs(3600),
            magic_link_ttl: Duration::from_secs(24 * 3600),
            base_url: "http://localhost:3000".to_string(),
            oauth: None,
        }
    }
}

impl AuthConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Read configuration from the environment, falling back to defaults.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `AUTH_MAX_FAILED_ATTEMPTS` | 5 |
    /// | `AUTH_LOCKOUT_DURATION_MS` | 900000 (15 min) |
    /// | `RATE_LIMIT_WINDOW_MS` | 900000 (15 min) |
    /// | `RATE_LIMIT_MAX_ATTEMPTS` | 10 |
    /// | `SESSION_SECRET` | random (logged at warn) |
    /// | `SESSION_TTL_MS` | 2592000000 (30 days) |
    /// | `PASSWORD_PEPPER` | unset |
    /// | `APP_BASE_URL` | `http://localhost:3000` |
    /// | `COOKIE_SECURE` | true |
    /// | `OAUTH_*` | unset |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(b64) => match decode_secret(&b64) {
                Some(secret) => secret,
                None => {
                    tracing::warn!(
                        "SESSION_SECRET is not valid base64 of 32 bytes, using a random secret"
                    );
                    random_secret()
                }
            },
            Err(_) => {
                tracing::warn!("SESSION_SECRET not set, using a random secret");
                random_secret()
            }
        };

        let rate_limit = RateLimitConfig::new(
            env_parse("RATE_LIMIT_MAX_ATTEMPTS", defaults.rate_limit.max_attempts),
            Duration::from_millis(env_parse(
                "RATE_LIMIT_WINDOW_MS",
                defaults.rate_limit.window.as_millis() as u64,
            )),
        );

        let oauth = std::env::var("OAUTH_CLIENT_ID").ok().map(|client_id| {
            OAuthSettings {
                client_id,
                client_secret: std::env::var("OAUTH_CLIENT_SECRET").unwrap_or_default(),
                auth_url: std::env::var("OAUTH_AUTH_URL").unwrap_or_default(),
                token_url: std::env::var("OAUTH_TOKEN_URL").unwrap_or_default(),
                userinfo_url: std::env::var("OAUTH_USERINFO_URL").unwrap_or_default(),
                redirect_url: std::env::var("OAUTH_REDIRECT_URL").unwrap_or_default(),
            }
        });

        Self {
            session_secret,
            session_ttl: Duration::from_millis(env_parse(
                "SESSION_TTL_MS",
                defaults.session_ttl.as_millis() as u64,
            )),
            cookie_secure: env_parse("COOKIE_SECURE", defaults.cookie_secure),
            password_pepper: std::env::var("PASSWORD_PEPPER")
                .ok()
                .and_then(|b64| platform::crypto::from_base64(&b64).ok()),
            max_failed_attempts: env_parse(
                "AUTH_MAX_FAILED_ATTEMPTS",
                defaults.max_failed_attempts,
            ),
            lockout_duration: Duration::from_millis(env_parse(
                "AUTH_LOCKOUT_DURATION_MS",
                defaults.lockout_duration.as_millis() as u64,
            )),
            rate_limit,
            base_url: std::env::var("APP_BASE_URL").unwrap_or_else(|_| defaults.base_url.clone()),
            oauth,
            ..defaults
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Lockout duration as a chrono duration (for timestamp arithmetic)
    pub fn lockout_chrono(&self) -> chrono::Duration {
        to_chrono(self.lockout_duration)
    }

    /// Verification token TTL as a chrono duration
    pub fn verification_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.verification_token_ttl)
    }

    /// Reset token TTL as a chrono duration
    pub fn reset_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.reset_token_ttl)
    }

    /// Magic-link token TTL as a chrono duration
    pub fn magic_link_ttl_chrono(&self) -> chrono::Duration {
        to_chrono(self.magic_link_ttl)
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(d.as_millis() as i64)
}

fn random_secret() -> [u8; 32] {
    use rand::RngCore;
    let mut secret = [0u8; 32];
    rand::rng().fill_bytes(&mut secret);
    secret
}

fn decode_secret(b64: &str) -> Option<[u8; 32]> {
    let bytes = platform::crypto::from_base64(b64).ok()?;
    bytes.try_into().ok()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
