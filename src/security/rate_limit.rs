//! Per-IP rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::RateLimitConfig;

/// Allow/deny gate consulted before any cache or upstream work.
pub trait RateLimiter: Send + Sync {
    fn check(&self, client: IpAddr) -> bool;

    /// Release state held for idle clients. Called periodically.
    fn prune_idle(&self) {}
}

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token bucket per client IP.
pub struct TokenBucketLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    rps: f64,
    burst: f64,
}

impl TokenBucketLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps: requests_per_second as f64,
            burst: burst_size as f64,
        }
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn check(&self, client: IpAddr) -> bool {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let bucket = buckets
            .entry(client)
            .or_insert_with(|| TokenBucket::new(self.burst));

        bucket.try_acquire(self.burst, self.rps)
    }

    /// Forget clients whose bucket has refilled completely.
    fn prune_idle(&self) {
        let now = Instant::now();
        if let Ok(mut buckets) = self.buckets.lock() {
            let (rps, burst) = (self.rps, self.burst);
            buckets.retain(|_, bucket| {
                let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
                bucket.tokens + elapsed * rps < burst
            });
        }
    }
}

/// Limiter used when rate limiting is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn check(&self, _client: IpAddr) -> bool {
        true
    }
}

/// Build the configured limiter.
pub fn from_config(config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
    if config.enabled {
        Arc::new(TokenBucketLimiter::new(
            config.requests_per_second,
            config.burst_size,
        ))
    } else {
        Arc::new(Unlimited)
    }
}
