//! Session Token Service
//!
//! Stateless JWT sessions: HS256-signed tokens carried in an HttpOnly
//! cookie, 30-day lifetime. Claims carry the public account id, role and
//! email-verified flag so request handling never needs a database round
//! trip. There is no server-side revocation; sign-out clears the cookie.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::entity::user::User;
use crate::domain::value_object::user_role::UserRole;
use crate::error::{AuthError, AuthResult};

/// JWT claims carried by the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Public account id
    pub sub: String,
    /// Role code ("customer" | "vendor" | "admin")
    pub role: String,
    /// Email-verified flag at issue time
    pub email_verified: bool,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

impl SessionClaims {
    /// Parse the role code, defaulting to customer for unknown values
    pub fn role(&self) -> UserRole {
        UserRole::from_code(&self.role).unwrap_or_default()
    }

    /// Expiry in unix milliseconds
    pub fn expires_at_ms(&self) -> i64 {
        (self.exp as i64) * 1000
    }
}

/// Issues and verifies session JWTs
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionTokenService {
    pub fn new(secret: &[u8; 32], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a session token for a user
    pub fn issue(&self, user: &User) -> AuthResult<String> {
        let now = unix_now()?;

        let claims = SessionClaims {
            sub: user.public_id.to_string(),
            role: user.role.code().to_string(),
            email_verified: user.email_verified,
            iat: now,
            exp: now + self.ttl.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify a session token and return its claims
    pub fn verify(&self, token: &str) -> AuthResult<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::SessionInvalid)
    }

    /// Session lifetime in seconds (for the cookie Max-Age)
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.as_secs() as i64
    }
}

fn unix_now() -> AuthResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Internal(format!("System clock before unix epoch: {}", e)))
}
