//! User Entity
//!
//! Marketplace account identity. Sensitive credential data lives in the
//! separate Credential entity; this record carries everything the rest of
//! the application is allowed to see.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    account_status::AccountStatus, email::Email, public_id::PublicId, user_id::UserId,
    user_role::UserRole,
};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Internal UUID identifier
    pub user_id: UserId,
    /// Public-facing nanoid identifier (URL-safe)
    pub public_id: PublicId,
    /// Normalized email address (unique)
    pub email: Email,
    /// Whether ownership of the email has been proven
    pub email_verified: bool,
    /// Display name shown in the marketplace
    pub display_name: Option<String>,
    /// Role (Customer, Vendor, Admin)
    pub role: UserRole,
    /// Status (Active, Suspended, Closed)
    pub status: AccountStatus,
    /// Last successful sign-in time
    pub last_login_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified account
    pub fn new(email: Email, display_name: Option<String>, role: UserRole) -> Self {
        let now = Utc::now();

        Self {
            user_id: UserId::new(),
            public_id: PublicId::new(),
            email,
            email_verified: false,
            display_name,
            role,
            status: AccountStatus::default(),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record successful sign-in
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Check if the account may sign in
    pub fn can_login(&self) -> bool {
        self.status.can_login()
    }

    /// Mark the email address as verified
    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.updated_at = Utc::now();
    }

    /// Account age relative to `now`
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Update account status
    pub fn set_status(&mut self, status: AccountStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
