//! Read-through cache collaborator.
//!
//! The cache is an accelerator, never a source of truth: implementations
//! absorb their own failures, log them, and report a miss.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

/// Key/value cache with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the cached value, or `None` on a miss or any failure.
    async fn try_get(&self, key: &str) -> Option<String>;

    /// Stores a value for `ttl`. Failures are swallowed.
    async fn try_set(&self, key: &str, value: &str, ttl: Duration);

    /// Drops a key. Failures are swallowed.
    async fn invalidate(&self, key: &str);
}

/// Typed JSON helpers for any [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Reads and decodes a JSON value; undecodable entries count as misses.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.try_get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encodes and stores a JSON value.
    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(raw) => self.try_set(key, &raw, ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "failed to encode cache entry"),
        }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}

/// A cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn try_get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn try_set(&self, _key: &str, _value: &str, _ttl: Duration) {}

    async fn invalidate(&self, _key: &str) {}
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with lazy expiry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn try_get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(e) if e.expires_at > Instant::now() => return Some(e.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.entries.write().await.remove(key);
        None
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

/// Redis-backed cache over a reconnecting connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connects to the Redis server at `url`.
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn try_get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn try_set(&self, key: &str, value: &str, ttl: Duration) {
        let mut conn = self.conn.clone();
        let result = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "redis SETEX failed");
        }
    }

    async fn invalidate(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            tracing::warn!(key, error = %e, "redis DEL failed");
        }
    }
}
