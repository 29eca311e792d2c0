//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::domain::value_object::user_role::UserRole;

// ============================================================================
// Sign Up
// ============================================================================

/// Self-registered account types; admin accounts are provisioned
/// out-of-band
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Customer,
    Vendor,
}

impl AccountType {
    pub fn to_role(self) -> UserRole {
        match self {
            AccountType::Customer => UserRole::Customer,
            AccountType::Vendor => UserRole::Vendor,
        }
    }
}

/// Sign up request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
}

/// Sign up response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub public_id: String,
}

// ============================================================================
// Sign In
// ============================================================================

/// Sign in request, discriminated by provider.
///
/// `{"provider": "credentials", "email": ..., "password": ...}`
/// authenticates directly; `{"provider": "email", "email": ...}` requests
/// a magic link. OAuth sign-in starts at its own endpoint because it is a
/// redirect, not a credential post.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum SignInRequest {
    #[serde(rename_all = "camelCase")]
    Credentials { email: String, password: String },
    #[serde(rename_all = "camelCase")]
    Email { email: String },
}

/// Sign in response (session cookie accompanies it)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub public_id: String,
    pub role: String,
    pub email_verified: bool,
}

/// Generic acknowledgement that deliberately reveals nothing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Session
// ============================================================================

/// Session status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub public_id: Option<String>,
    pub role: Option<String>,
    pub email_verified: Option<bool>,
    pub expires_at_ms: Option<i64>,
}

// ============================================================================
// Tokens (verification / reset / magic link)
// ============================================================================

/// Request carrying only an email address
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

/// Token carried as a query parameter on emailed links
#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Password reset confirmation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// OAuth
// ============================================================================

/// OAuth start response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthStartResponse {
    pub authorize_url: String,
}

/// Provider redirect query
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
    pub state: String,
}

// ============================================================================
// Admin: security events
// ============================================================================

/// Admin event-listing query
#[derive(Debug, Clone, Deserialize)]
pub struct EventsQuery {
    /// Public id of the account to inspect
    pub user: String,
    pub limit: Option<i64>,
}

/// One security event, as exposed to the back office
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventResponse {
    pub kind: String,
    pub details: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at_ms: i64,
}
