//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the proxy handler and its collaborators from configuration
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::CacheError;
use crate::config::{ConfigError, GatewayConfig};
use crate::http::ProxyHandler;
use crate::upstream::UpstreamError;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache backend error: {0}")]
    Cache(#[from] CacheError),

    #[error("upstream client error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the handler with production collaborators.
pub fn build_handler(config: &GatewayConfig) -> Result<Arc<ProxyHandler>, StartupError> {
    let handler = ProxyHandler::builder(config).build()?;

    if config.upstream.api_token.is_none() {
        tracing::warn!("No upstream API token configured; every proxy request will be rejected");
    }

    tracing::info!(
        upstream = %config.upstream.base_url,
        mount_path = %config.listener.mount_path,
        rules = config.allowlist.rules.len(),
        rate_limit = config.rate_limit.enabled,
        "Proxy handler ready"
    );

    Ok(Arc::new(handler))
}

/// Bind the configured listen address.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
