//! Redis-backed shared cache.
//!
//! Entries are Redis hashes (`body`, `contentType`, `statusCode`). A write is a
//! single `MULTI / HSET / EXPIRE / EXEC` transaction, so readers never see an
//! entry without its TTL.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use crate::cache::{CacheBackend, CacheEntry, CacheError};

/// Shared cache stored in Redis.
///
/// The connection is established on first use. If Redis is down at startup
/// the gateway still boots and every lookup is a miss until it comes back.
pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    op_timeout: Duration,
}

impl RedisCache {
    /// Create a cache for `url`. Only validates the URL; does not connect.
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            op_timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(1);
                let manager = self
                    .client
                    .get_connection_manager_with_config(config)
                    .await
                    .map_err(|e| CacheError::Unavailable(e.to_string()))?;
                tracing::info!("Connected to Redis cache");
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let fields: HashMap<String, String> = tokio::time::timeout(self.op_timeout, async {
            let mut conn = self.connection().await?;
            let fields: HashMap<String, String> = conn.hgetall(key).await?;
            Ok::<_, CacheError>(fields)
        })
        .await
        .map_err(|_| CacheError::Timeout(self.op_timeout))??;

        CacheEntry::from_fields(fields)
    }

    async fn put(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), CacheError> {
        let ttl_secs = ttl.as_secs().max(1) as i64;

        tokio::time::timeout(self.op_timeout, async {
            let mut conn = self.connection().await?;
            let _: () = redis::pipe()
                .atomic()
                .hset_multiple(key, &entry.to_fields())
                .ignore()
                .expire(key, ttl_secs)
                .ignore()
                .query_async(&mut conn)
                .await?;
            Ok::<_, CacheError>(())
        })
        .await
        .map_err(|_| CacheError::Timeout(self.op_timeout))?
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(RedisCache::new("not a redis url", Duration::from_millis(100)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_an_error_not_a_panic() {
        // Port 1 is reserved; nothing listens there.
        let cache = RedisCache::new("redis://127.0.0.1:1/", Duration::from_millis(200)).unwrap();
        assert!(matches!(
            cache.get("scix:cache:GET:/search/query").await,
            Err(CacheError::Unavailable(_)) | Err(CacheError::Timeout(_))
        ));

        let entry = CacheEntry::new("{}", "application/json", 200);
        assert!(cache
            .put("scix:cache:GET:/search/query", &entry, Duration::from_secs(5))
            .await
            .is_err());
    }
}
