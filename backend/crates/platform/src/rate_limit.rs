//! Rate Limiting Infrastructure
//!
//! Common rate limiting abstractions. Concrete storage backends live in
//! the crates that own the store connections.

use std::time::Duration;

/// Rate limit configuration: fixed window with a per-window cap
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_attempts: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(15 * 60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Result representing an unconstrained pass (used when the backing
    /// store is unavailable and the policy is to fail open)
    pub fn pass(config: &RateLimitConfig, now_ms: i64) -> Self {
        Self {
            allowed: true,
            remaining: config.max_attempts,
            reset_at_ms: now_ms + config.window_ms(),
        }
    }
}

/// Trait for rate limit storage backends
///
/// `check_and_increment` must be atomic per key: concurrent callers may
/// never observe the same counter value.
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Increment the counter for `key` and report whether the attempt is
    /// within the window cap.
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;
}
