//! Cache backend abstraction and in-process implementations.
//!
//! # Responsibilities
//! - Define the hash-get-all / hash-set + expire contract the policy needs
//! - Provide a process-local store for single-node deployments and tests
//! - Provide a no-op store for running with caching disabled
//!
//! # Design Decisions
//! - Every operation returns `Result`; policy code decides what an error means
//! - A write replaces the whole entry and its expiry together

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheError};

/// Key-value store holding cached responses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read the entry stored under `key`, `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store `entry` under `key` and set its time-to-live.
    async fn put(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Drop expired entries. Backends with server-side expiry do nothing.
    fn purge_expired(&self) {}
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

/// Process-local cache with per-entry expiry.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, StoredEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = Instant::now();
        let hit = self
            .inner
            .get(key)
            .map(|stored| (stored.expires_at > now).then(|| stored.entry.clone()));

        match hit {
            Some(Some(entry)) => Ok(Some(entry)),
            Some(None) => {
                self.inner.remove_if(key, |_, stored| stored.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(
            key.to_string(),
            StoredEntry {
                entry: entry.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.inner.retain(|_, stored| stored.expires_at > now);
    }
}

/// Backend used when caching is disabled: always a miss, writes discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheBackend for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _entry: &CacheEntry, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
