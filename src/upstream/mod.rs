//! Upstream search API client.
//!
//! # Responsibilities
//! - Forward allow-listed GET requests with the bearer credential attached
//! - Return status, content type and the full body to the handler
//!
//! # Design Decisions
//! - No retries at this layer; a transport failure is reported once
//! - Timeouts come from the HTTP client configuration
//! - The forwarded path must survive URL normalisation unchanged

pub mod http;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

pub use self::http::HttpUpstream;

/// A request to forward upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Path as received (still percent-encoded), starting with `/`.
    pub path: String,
    /// Canonical query string without the leading `?`; may be empty.
    pub query: String,
    /// Bearer credential.
    pub token: String,
    /// Correlation ID propagated as `X-Request-Id`.
    pub request_id: Option<String>,
}

/// A complete upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Value of the upstream `Content-Type` header, if any.
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Errors raised while talking to the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network failure, timeout, or an unreadable response.
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream URL could not be built.
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    /// URL normalisation would forward a different path than the one checked.
    #[error("Upstream path rewritten from '{requested}' to '{resolved}'")]
    PathRewritten { requested: String, resolved: String },
}

/// Upstream service the gateway forwards to.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}
