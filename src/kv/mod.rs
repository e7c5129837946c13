//! Ephemeral key-value store contract.
//!
//! The auth subsystem keeps three short-lived registries in this store: the
//! refresh-token registry, the token blacklist, and the CSRF token registry.
//! Every entry carries a TTL; nothing here is durable state.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Minimal TTL-aware key-value contract.
///
/// Callers decide how to treat store failures: verification paths fail
/// closed, best-effort revocation paths log and continue.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Set `key` to `value`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Get the live value at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete `key`. Returns true when a key was actually removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether a live entry exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete every key starting with `prefix`. Returns the removed count.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Redis-backed store for production deployments.
///
/// `ConnectionManager` multiplexes one connection and reconnects on failure;
/// clones are cheap handles onto the same connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: redis::aio::ConnectionManager,
}

impl RedisKv {
    /// Connect to Redis and verify the connection with a PING.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or Redis is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let mut conn = redis::aio::ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .context("redis ping failed")?;
        Ok(Self { conn })
    }

    /// Ping the store, used by the health endpoint.
    ///
    /// # Errors
    /// Returns an error when Redis does not answer.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .context("redis ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET with EX: Redis evicts the key once the TTL elapses.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .with_context(|| format!("redis SET failed for {key}"))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("redis GET failed for {key}"))?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(key)
            .await
            .with_context(|| format!("redis DEL failed for {key}"))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn
            .exists(key)
            .await
            .with_context(|| format!("redis EXISTS failed for {key}"))?;
        Ok(found)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = {
            let mut conn = self.conn.clone();
            let mut iter = conn
                .scan_match::<_, String>(&pattern)
                .await
                .with_context(|| format!("redis SCAN failed for {pattern}"))?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(&keys)
            .await
            .with_context(|| format!("redis DEL failed for {pattern}"))?;
        Ok(removed)
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process store with the same TTL semantics, used by tests and local
/// development. Expired entries are purged lazily on access.
#[derive(Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl InMemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        Ok(entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        Ok(entries.contains_key(key))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > Instant::now());
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}
