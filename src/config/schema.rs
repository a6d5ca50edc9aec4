//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::allowlist::{default_rules, PathRule};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, mount path).
    pub listener: ListenerConfig,

    /// Upstream search API.
    pub upstream: UpstreamConfig,

    /// Shared response cache.
    pub cache: CacheConfig,

    /// Paths that may be forwarded upstream.
    pub allowlist: AllowlistConfig,

    /// Origin checks and client address handling.
    pub security: SecurityConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Prefix under which the proxy is mounted. The rest of the request
    /// path is the upstream path. Empty mounts the proxy at the root.
    pub mount_path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            mount_path: "/api/proxy".to_string(),
        }
    }
}

/// Upstream API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL that upstream paths are appended to.
    pub base_url: String,

    /// Service bearer token attached to forwarded requests.
    pub api_token: Option<String>,

    /// Total upstream request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.adsabs.harvard.edu/v1".to_string(),
            api_token: None,
            timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Which store holds cached responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Shared Redis instance.
    #[default]
    Redis,
    /// Process-local map.
    Memory,
    /// No caching.
    Disabled,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache backend.
    pub backend: CacheBackendKind,

    /// Redis connection URL.
    pub redis_url: String,

    /// Time-to-live for every entry, in seconds.
    pub ttl_secs: u64,

    /// Largest response body that may be cached, in bytes.
    pub max_body_bytes: usize,

    /// Deadline for a single cache operation, in milliseconds.
    pub operation_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            ttl_secs: 300,
            max_body_bytes: 5 * 1024 * 1024, // 5MB
            operation_timeout_ms: 250,
        }
    }
}

/// Allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllowlistConfig {
    /// Ordered rules; a path is forwarded if any rule matches.
    pub rules: Vec<PathRule>,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Origins allowed to use the proxy. Empty disables the check.
    pub allowed_origins: Vec<String>,

    /// Take the client IP from the first `X-Forwarded-For` entry.
    /// Only enable behind a proxy that sets the header.
    pub trust_forwarded_for: bool,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 20,
            burst_size: 40,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
