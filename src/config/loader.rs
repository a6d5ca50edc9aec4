//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_BIND_ADDRESS: &str = "SCIX_BIND_ADDRESS";
pub const ENV_UPSTREAM_URL: &str = "SCIX_UPSTREAM_URL";
pub const ENV_API_TOKEN: &str = "SCIX_API_TOKEN";
pub const ENV_REDIS_URL: &str = "SCIX_REDIS_URL";
pub const ENV_CACHE_TTL_SECS: &str = "SCIX_CACHE_TTL_SECS";
pub const ENV_CACHE_MAX_BODY_BYTES: &str = "SCIX_CACHE_MAX_BODY_BYTES";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => write!(f, "Invalid value for {}: '{}'", key, value),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_file(path)?,
        None => {
            tracing::info!("No config file given, using defaults");
            GatewayConfig::default()
        }
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Apply `SCIX_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(mut config: GatewayConfig, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup(ENV_UPSTREAM_URL) {
        config.upstream.base_url = v;
    }
    if let Some(v) = lookup(ENV_API_TOKEN) {
        config.upstream.api_token = Some(v);
    }
    if let Some(v) = lookup(ENV_REDIS_URL) {
        config.cache.redis_url = v;
    }
    if let Some(v) = lookup(ENV_CACHE_TTL_SECS) {
        config.cache.ttl_secs = parse_env(ENV_CACHE_TTL_SECS, v)?;
    }
    if let Some(v) = lookup(ENV_CACHE_MAX_BODY_BYTES) {
        config.cache.max_body_bytes = parse_env(ENV_CACHE_MAX_BODY_BYTES, v)?;
    }
    Ok(config)
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
