//! Redis Cache Store
//!
//! Two concerns live here: the thin connection wrapper used for OAuth
//! handshake state, and the rate-limit counter store. Counters use a
//! single `INCR` so concurrent attempts can never read the same value;
//! the key TTL is set on the first increment and equals the window, which
//! makes the window fixed rather than sliding.

use redis::{AsyncCommands, Client};

use chrono::Utc;
use platform::rate_limit::{RateLimitConfig, RateLimitResult};

/// Redis connection wrapper
///
/// `Client::open` only parses the URL; connections are established per
/// call, so constructing the pool never fails on an unreachable server.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    /// Set a key with an optional TTL in seconds
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: Option<u64>,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.connection().await?;
        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }
        Ok(())
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.connection().await?;
        conn.get(key).await
    }

    /// Get a value and delete the key in one command (single-use state)
    pub async fn take(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.connection().await?;
        conn.get_del(key).await
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Check if the server is reachable
    pub async fn health_check(&self) -> Result<bool, redis::RedisError> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

/// Fixed-window rate-limit counters in Redis
#[derive(Clone)]
pub struct RedisRateLimitStore {
    pool: RedisPool,
}

impl RedisRateLimitStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

impl platform::rate_limit::RateLimitStore for RedisRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.pool.connection().await?;

        // Atomic counter: two concurrent attempts always see distinct
        // values (no read-then-write)
        let count: i64 = conn.incr(key, 1).await?;

        if count == 1 {
            // First hit opens the window
            let _: bool = conn.expire(key, config.window_secs() as i64).await?;
        }

        let ttl_ms: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        let now_ms = Utc::now().timestamp_millis();
        let reset_at_ms = now_ms + ttl_ms.max(0);

        let max = config.max_attempts as i64;
        Ok(RateLimitResult {
            allowed: count <= max,
            remaining: (max - count).max(0) as u32,
            reset_at_ms,
        })
    }
}
