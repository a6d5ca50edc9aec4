//! Read/write policy around the shared cache.
//!
//! # Responsibilities
//! - Lookup before forwarding, treating backend errors as a miss (fail-open)
//! - Decide which upstream responses may be written
//! - Write with a uniform TTL, logging and swallowing failures
//!
//! # Design Decisions
//! - Only 2xx responses within the size bound are cached
//! - The cached copy is an optimization: no cache error ever reaches a client

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheBackend, CacheEntry};
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Why a response was not written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Upstream status outside 2xx.
    Status,
    /// Body larger than the configured maximum.
    TooLarge,
    /// Body is not valid UTF-8.
    Encoding,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Status => "status",
            SkipReason::TooLarge => "too_large",
            SkipReason::Encoding => "encoding",
        }
    }
}

/// Cache policy shared by all request handlers.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    max_body_bytes: usize,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, max_body_bytes: usize) -> Self {
        Self {
            backend,
            ttl,
            max_body_bytes,
        }
    }

    pub fn from_config(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self::new(
            backend,
            Duration::from_secs(config.ttl_secs),
            config.max_body_bytes,
        )
    }

    /// Evict expired entries from backends that do not expire on their own.
    pub fn purge_expired(&self) {
        self.backend.purge_expired();
    }

    /// Look up `key`. Any backend failure is logged and reported as a miss.
    pub async fn lookup(&self, key: &str, path: &str) -> Option<CacheEntry> {
        match self.backend.get(key).await {
            Ok(Some(entry)) => {
                metrics::record_cache_lookup("hit");
                Some(entry)
            }
            Ok(None) => {
                metrics::record_cache_lookup("miss");
                None
            }
            Err(e) => {
                tracing::warn!(
                    cache_key = %key,
                    path = %path,
                    backend = self.backend.name(),
                    error = %e,
                    "Cache read failed, treating as miss"
                );
                metrics::record_cache_lookup("error");
                None
            }
        }
    }

    /// Check status and size bounds for a response.
    pub fn check_cacheable(&self, status: u16, body_len: usize) -> Result<(), SkipReason> {
        if !(200..300).contains(&status) {
            return Err(SkipReason::Status);
        }
        if body_len > self.max_body_bytes {
            return Err(SkipReason::TooLarge);
        }
        Ok(())
    }

    /// Build the entry to write for an upstream response, if it qualifies.
    pub fn prepare_entry(
        &self,
        status: u16,
        content_type: &str,
        body: &[u8],
    ) -> Result<CacheEntry, SkipReason> {
        self.check_cacheable(status, body.len())?;
        let body = std::str::from_utf8(body).map_err(|_| SkipReason::Encoding)?;
        Ok(CacheEntry::new(body, content_type, status))
    }

    /// Write `entry` under `key`. Failures are logged and swallowed.
    pub async fn store(&self, key: &str, path: &str, entry: &CacheEntry) {
        match self.backend.put(key, entry, self.ttl).await {
            Ok(()) => {
                tracing::debug!(
                    cache_key = %key,
                    ttl_secs = self.ttl.as_secs(),
                    bytes = entry.body.len(),
                    "Response cached"
                );
                metrics::record_cache_write("stored");
            }
            Err(e) => {
                tracing::warn!(
                    cache_key = %key,
                    path = %path,
                    backend = self.backend.name(),
                    error = %e,
                    "Cache write failed"
                );
                metrics::record_cache_write("failed");
            }
        }
    }
}
