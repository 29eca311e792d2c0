//! Suspicious Activity Heuristic
//!
//! Advisory signals computed from the security event log at successful
//! sign-in. The result is recorded, never enforced: no sign-in is blocked
//! or challenged because of it.

use chrono::Duration;
use serde::Serialize;

/// Failed sign-ins within the window that trigger a signal
pub const FAILED_LOGIN_THRESHOLD: i64 = 3;

/// Distinct successful-login IPs within the window above which a signal
/// triggers (strictly more than this many)
pub const DISTINCT_IP_THRESHOLD: i64 = 3;

/// Trailing window the signals are computed over
pub fn activity_window() -> Duration {
    Duration::hours(1)
}

/// Accounts younger than this are flagged when active
pub fn new_account_age() -> Duration {
    Duration::hours(24)
}

/// Individual suspicion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionReason {
    /// Three or more failed sign-ins in the trailing window
    RepeatedFailures,
    /// Successful sign-ins from more than three distinct IPs
    ManyIps,
    /// Account created less than 24 hours ago
    NewAccount,
}

impl SuspicionReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RepeatedFailures => "repeated_failures",
            Self::ManyIps => "many_ips",
            Self::NewAccount => "new_account",
        }
    }
}

/// Aggregated recent activity for one account
#[derive(Debug, Clone)]
pub struct ActivitySummary {
    /// Failed sign-ins in the trailing window
    pub failed_logins: i64,
    /// Distinct IPs with successful sign-ins in the trailing window
    pub distinct_login_ips: i64,
    /// Account age at evaluation time
    pub account_age: Duration,
}

/// Evaluate the three independent signals and return the union of those
/// that triggered.
pub fn evaluate(summary: &ActivitySummary) -> Vec<SuspicionReason> {
    let mut reasons = Vec::new();

    if summary.failed_logins >= FAILED_LOGIN_THRESHOLD {
        reasons.push(SuspicionReason::RepeatedFailures);
    }
    if summary.distinct_login_ips > DISTINCT_IP_THRESHOLD {
        reasons.push(SuspicionReason::ManyIps);
    }
    if summary.account_age < new_account_age() {
        reasons.push(SuspicionReason::NewAccount);
    }

    reasons
}
