//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, timeouts > 0, addresses parse)
//! - Check that the allow-list and origins are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{CacheBackendKind, GatewayConfig};
use crate::security::PathRule;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let mount = &config.listener.mount_path;
    if !mount.is_empty() && (!mount.starts_with('/') || mount.ends_with('/')) {
        errors.push(ValidationError::new(
            "listener.mount_path",
            "must be empty or start with '/' and not end with '/'",
        ));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
    }

    if config.cache.max_body_bytes == 0 {
        errors.push(ValidationError::new("cache.max_body_bytes", "must be greater than 0"));
    }

    if config.cache.backend == CacheBackendKind::Redis {
        match Url::parse(&config.cache.redis_url) {
            Ok(url) if matches!(url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") => {}
            Ok(url) => errors.push(ValidationError::new(
                "cache.redis_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("cache.redis_url", e.to_string())),
        }

        if config.cache.operation_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "cache.operation_timeout_ms",
                "must be greater than 0",
            ));
        }
    }

    if config.allowlist.rules.is_empty() {
        errors.push(ValidationError::new(
            "allowlist.rules",
            "at least one rule is required",
        ));
    }

    for rule in &config.allowlist.rules {
        let path = match rule {
            PathRule::Exact(p) | PathRule::Prefix(p) => p,
        };
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "allowlist.rules",
                format!("rule '{}' must start with '/'", path),
            ));
        }
    }

    for origin in &config.security.allowed_origins {
        if Url::parse(origin).is_err() {
            errors.push(ValidationError::new(
                "security.allowed_origins",
                format!("'{}' is not a valid origin", origin),
            ));
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::new(
                "rate_limit.requests_per_second",
                "must be greater than 0",
            ));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::new("rate_limit.burst_size", "must be greater than 0"));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else if config.timeouts.request_secs <= config.upstream.timeout_secs {
        // The upstream timeout fires before the request timeout.
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must be greater than upstream.timeout_secs ({})",
                config.upstream.timeout_secs
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.cache.ttl_secs = 0;
        config.cache.max_body_bytes = 0;
        config.listener.mount_path = "api/".into();
        config.allowlist.rules.clear();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.mount_path",
                "cache.ttl_secs",
                "cache.max_body_bytes",
                "allowlist.rules"
            ]
        );
    }

    #[test]
    fn test_redis_url_only_checked_for_redis_backend() {
        let mut config = GatewayConfig::default();
        config.cache.redis_url = "http://nope".into();
        assert!(validate_config(&config).is_err());

        config.cache.backend = CacheBackendKind::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rules_must_be_absolute() {
        let mut config = GatewayConfig::default();
        config.allowlist.rules = vec![PathRule::Prefix("resolver/".into())];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "allowlist.rules");
    }

    #[test]
    fn test_rate_limit_values_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.rate_limit.requests_per_second = 0;
        assert!(validate_config(&config).is_err());

        config.rate_limit.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_request_timeout_must_exceed_upstream_timeout() {
        let mut config = GatewayConfig::default();
        config.upstream.timeout_secs = 30;
        config.timeouts.request_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "timeouts.request_secs");

        config.timeouts.request_secs = 31;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_root_mount_is_allowed() {
        let mut config = GatewayConfig::default();
        config.listener.mount_path = String::new();
        assert!(validate_config(&config).is_ok());
    }
}
