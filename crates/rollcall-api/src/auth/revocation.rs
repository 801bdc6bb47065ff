//! Revocation ledger for logged-out tokens
//!
//! Each entry lives exactly as long as the token it revokes had left, so the
//! ledger never grows past the set of still-unexpired logged-out tokens.
//!
//! Two backends:
//! - [`MemoryRevocationStore`]: moka cache with per-entry TTL, for a single
//!   instance and for tests
//! - [`RedisRevocationStore`]: shared across instances via `SET ... PX`

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::ConnectionManager;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Revocation store errors
///
/// Callers must treat every variant as "cannot confirm the token is not
/// revoked".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Revocation store unavailable: {0}")]
    Unavailable(String),

    #[error("Revocation store timed out after {0:?}")]
    Timeout(Duration),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Shared record of tokens invalidated before their natural expiry
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `token_id` revoked for `ttl`; a zero TTL is a successful no-op
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Whether `token_id` is currently revoked
    ///
    /// An unreachable store is an error, never `Ok(false)`.
    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Check that the backend answers
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Expire each entry after the TTL it was stored with
struct RevocationExpiry;

impl Expiry<String, Duration> for RevocationExpiry {
    fn expire_after_create(&self, _key: &String, ttl: &Duration, _created_at: Instant) -> Option<Duration> {
        Some(*ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        ttl: &Duration,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(*ttl)
    }
}

/// In-process revocation store
///
/// The cache has no entry cap: an evicted entry would make a revoked token
/// valid again. Per-entry expiry bounds it to the logged-out tokens that
/// have not lapsed yet.
#[derive(Clone)]
pub struct MemoryRevocationStore {
    cache: Cache<String, Duration>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        let cache = Cache::builder().expire_after(RevocationExpiry).build();

        Self { cache }
    }
}

impl Default for MemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }
        self.cache.insert(token_id.to_string(), ttl).await;
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        Ok(self.cache.get(token_id).await.is_some())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Redis-backed revocation store shared by every API instance
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisRevocationStore {
    /// Connect to Redis at `url`
    ///
    /// The connection manager reconnects on its own after failures; calls
    /// made while it is down return `StoreError::Unavailable`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, token_id: &str) -> String {
        revocation_key(&self.key_prefix, token_id)
    }
}

fn revocation_key(prefix: &str, token_id: &str) -> String {
    format!("{prefix}:revoked:{token_id}")
}

/// Millisecond TTL for Redis, rounded up so the entry never lapses early
fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), StoreError> {
        if ttl.is_zero() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(token_id))
            .arg(1)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = redis::cmd("EXISTS")
            .arg(self.key(token_id))
            .query_async(&mut conn)
            .await?;

        Ok(exists)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
