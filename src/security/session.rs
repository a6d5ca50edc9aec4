//! Upstream credential source.

use async_trait::async_trait;
use axum::http::HeaderMap;

/// Yields the bearer token attached to upstream requests.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Token for this request, or `None` if the caller has no usable session.
    async fn bearer_token(&self, headers: &HeaderMap) -> Option<String>;
}

/// Provides a single service token from configuration.
#[derive(Clone, Default)]
pub struct StaticTokenSession {
    token: Option<String>,
}

impl StaticTokenSession {
    /// Blank tokens are treated as missing.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl std::fmt::Debug for StaticTokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenSession")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl SessionProvider for StaticTokenSession {
    async fn bearer_token(&self, _headers: &HeaderMap) -> Option<String> {
        self.token.clone()
    }
}
