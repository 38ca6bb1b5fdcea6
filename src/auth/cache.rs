//! Revocation cache: the record of which token is currently valid per user.
//!
//! Each user has at most one entry, `token:valid:<user_id>`, holding the raw
//! token string of their live session. Overwriting the entry supersedes the
//! previous session; deleting it ends the session.

use async_trait::async_trait;
use deadpool_redis::{Pool, Runtime};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::types::UserId;

/// Key namespace for valid-token records.
pub const REVOCATION_KEY_PREFIX: &str = "token:valid:";

/// Key under which `user_id`'s current token is stored.
pub fn revocation_key(user_id: &UserId) -> String {
    format!("{}{}", REVOCATION_KEY_PREFIX, user_id)
}

/// Cache failures. Never used to signal a missing key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// Key-value operations the session layer performs against the cache.
#[async_trait]
pub trait RevocationCache: Send + Sync {
    /// Store `value` under `key` for `ttl`, replacing any existing value.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Current value of `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Build the cache selected by `config`, verifying connectivity up front.
pub async fn connect_cache(config: &CacheConfig) -> anyhow::Result<Arc<dyn RevocationCache>> {
    if config.is_memory() {
        tracing::warn!("using in-process revocation cache; sessions are not shared between instances");
        return Ok(Arc::new(MemoryRevocationCache::new()));
    }

    let cache = RedisRevocationCache::connect(config).await?;
    Ok(Arc::new(cache))
}

// ============================================================================
// Redis
// ============================================================================

/// Revocation cache backed by a pooled Redis connection.
#[derive(Clone)]
pub struct RedisRevocationCache {
    pool: Pool,
    timeout: Duration,
}

impl RedisRevocationCache {
    /// Create the pool and PING once so a bad URL fails at startup.
    pub async fn connect(config: &CacheConfig) -> anyhow::Result<Self> {
        tracing::info!(url = %redact_url(&config.url), "connecting to Redis");

        let mut redis_config = deadpool_redis::Config::from_url(&config.url);
        if let Some(ref mut pool_config) = redis_config.pool {
            pool_config.max_size = config.pool_size;
            pool_config.timeouts.wait = Some(config.timeout);
            pool_config.timeouts.create = Some(config.timeout);
            pool_config.timeouts.recycle = Some(config.timeout);
        }

        let pool = redis_config.create_pool(Some(Runtime::Tokio1))?;
        let cache = Self {
            pool,
            timeout: config.timeout,
        };
        cache.ping().await?;

        tracing::info!("connected to Redis");
        Ok(cache)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async::<String>(&mut conn)
                .await
                .map(|_| ())
                .map_err(unavailable)
        })
        .await
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.timeout)))
    }
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        // EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(key, value, seconds)
                .await
                .map_err(unavailable)
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.get::<_, Option<String>>(key).await.map_err(unavailable)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            conn.del::<_, ()>(key).await.map_err(unavailable)
        })
        .await
    }
}

fn unavailable(err: redis::RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

/// Drop credentials from a Redis URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

// ============================================================================
// In-process
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Single-process revocation cache with lazy TTL expiry.
///
/// Suitable for local development and tests; multiple server instances do
/// not see each other's sessions.
#[derive(Clone, Default)]
pub struct MemoryRevocationCache {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

impl MemoryRevocationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationCache for MemoryRevocationCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
