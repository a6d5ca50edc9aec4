//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! query string
//!     → params.rs (raw bag → NormalizedParams)
//!     → key.rs (method + path + params → cache key)
//!     → policy.rs (lookup / cacheability / store)
//!     → backend.rs, redis_store.rs (memory, redis, disabled)
//! ```
//!
//! # Design Decisions
//! - Key building is pure and synchronous; only backend calls suspend
//! - The backend is injected, never a process-wide singleton
//! - Backend failures degrade to a miss or a skipped write

pub mod backend;
pub mod entry;
pub mod key;
pub mod params;
pub mod policy;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{CacheBackendKind, CacheConfig};

pub use backend::{CacheBackend, MemoryCache, NoopCache};
pub use entry::CacheEntry;
pub use key::{build_cache_key, canonical_query, CACHE_NAMESPACE};
pub use params::{flatten_params, NormalizedParams, ParamValue, RawParams};
pub use policy::{ResponseCache, SkipReason};
pub use redis_store::RedisCache;

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis returned an error or the connection failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The operation did not complete in time.
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// The backend cannot be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A stored entry could not be decoded.
    #[error("Malformed cache entry: {0}")]
    Malformed(String),
}

/// Build the configured backend.
pub fn build_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, CacheError> {
    let backend: Arc<dyn CacheBackend> = match config.backend {
        CacheBackendKind::Redis => Arc::new(RedisCache::new(
            &config.redis_url,
            Duration::from_millis(config.operation_timeout_ms),
        )?),
        CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
        CacheBackendKind::Disabled => Arc::new(NoopCache),
    };

    tracing::info!(
        backend = backend.name(),
        ttl_secs = config.ttl_secs,
        max_body_bytes = config.max_body_bytes,
        "Cache backend configured"
    );

    Ok(backend)
}
