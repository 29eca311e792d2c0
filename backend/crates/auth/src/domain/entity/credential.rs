//! Credential Entity
//!
//! Password credential and lockout bookkeeping for a user. Separated from
//! the User entity to isolate sensitive data; OAuth-only accounts have no
//! credential row.
//!
//! Lockout state machine: unlocked -> (failures accumulate) -> locked with
//! an expiry -> unlocked again, observed lazily on the next check. There is
//! no background sweep; a locked account that never attempts another
//! sign-in simply stays marked locked in storage.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{user_id::UserId, user_password::UserPassword};

/// Password credential entity
#[derive(Debug, Clone)]
pub struct Credential {
    /// Reference to User
    pub user_id: UserId,
    /// Hashed password (Argon2id PHC string)
    pub password_hash: UserPassword,
    /// Consecutive failed sign-in count
    pub failed_attempts: u32,
    /// Whether the account is currently marked locked
    pub locked: bool,
    /// Lockout expiry; always set while `locked` is true
    pub locked_until: Option<DateTime<Utc>>,
    /// Last failed sign-in time
    pub last_failed_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Result of recording a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutOutcome {
    pub failed_attempts: u32,
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Credential {
    /// Create new credential for a user
    pub fn new(user_id: UserId, password_hash: UserPassword) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            password_hash,
            failed_attempts: 0,
            locked: false,
            locked_until: None,
            last_failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account is locked as of `now`
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        match (self.locked, self.locked_until) {
            (true, Some(until)) => now < until,
            _ => false,
        }
    }

    /// Check if a previous lockout has expired and should be cleared
    pub fn lock_expired(&self, now: DateTime<Utc>) -> bool {
        matches!((self.locked, self.locked_until), (true, Some(until)) if now >= until)
    }

    /// Record a failed sign-in attempt
    ///
    /// Locks the account once `max_attempts` is reached. The persistent
    /// store applies this same transition in a single atomic statement;
    /// this method is the in-memory equivalent.
    pub fn record_failure(
        &mut self,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: Duration,
    ) -> LockoutOutcome {
        self.failed_attempts += 1;
        self.last_failed_at = Some(now);
        self.updated_at = now;

        if self.failed_attempts >= max_attempts {
            self.locked = true;
            self.locked_until = Some(now + lockout);
        }

        LockoutOutcome {
            failed_attempts: self.failed_attempts,
            locked: self.locked,
            locked_until: self.locked_until,
        }
    }

    /// Clear failure count and lock fields
    pub fn reset_failures(&mut self, now: DateTime<Utc>) {
        self.failed_attempts = 0;
        self.locked = false;
        self.locked_until = None;
        self.last_failed_at = None;
        self.updated_at = now;
    }

    /// Replace the password hash and clear lockout state
    pub fn update_password(&mut self, new_password: UserPassword) {
        let now = Utc::now();
        self.password_hash = new_password;
        self.reset_failures(now);
    }
}
