//! Proxy request handling.
//!
//! # Request Flow
//! ```text
//! received
//!     → method check (GET only)
//!     → path check (allow-list, before any auth work)
//!     → credential (session provider)
//!     → origin check
//!     → rate limit
//!     → cache lookup ──hit──▶ served from cache (X-Cache: HIT)
//!     → forward upstream (spawned) → [cache write, detached]
//!     → served from upstream (X-Cache: MISS)
//! ```
//!
//! # Design Decisions
//! - Linear, no retries at this layer
//! - Nothing past the rate limit is reachable by rejected traffic
//! - The forward runs on its own task: a client disconnect does not cancel
//!   an upstream call whose result other clients may be waiting on
//! - Cache writes never delay the response

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;

use crate::cache::{
    build_backend, build_cache_key, canonical_query, flatten_params, CacheBackend, RawParams,
    ResponseCache,
};
use crate::config::GatewayConfig;
use crate::http::error::ProxyError;
use crate::http::request::request_id;
use crate::http::response::{self, X_CACHE, X_CACHE_HIT, X_CACHE_MISS};
use crate::lifecycle::startup::StartupError;
use crate::observability::metrics;
use crate::security::{
    has_encoded_delimiter, rate_limit, AllowedOrigins, OriginValidator, PathAllowlist, RateLimiter, SessionProvider,
    StaticTokenSession,
};
use crate::upstream::{HttpUpstream, Upstream, UpstreamError, UpstreamRequest};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The proxy pipeline with all of its collaborators.
pub struct ProxyHandler {
    mount_path: String,
    allowlist: PathAllowlist,
    sessions: Arc<dyn SessionProvider>,
    origins: Arc<dyn OriginValidator>,
    rate_limiter: Arc<dyn RateLimiter>,
    cache: ResponseCache,
    upstream: Arc<dyn Upstream>,
    trust_forwarded_for: bool,
}

impl ProxyHandler {
    /// Start building a handler. Collaborators not supplied explicitly are
    /// created from `config`.
    pub fn builder(config: &GatewayConfig) -> ProxyHandlerBuilder<'_> {
        ProxyHandlerBuilder {
            config,
            cache_backend: None,
            upstream: None,
            sessions: None,
            origins: None,
            rate_limiter: None,
        }
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    pub fn rate_limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Handle one proxy request. Never fails: errors become JSON responses.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();

        let response = match self.process(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_rejection(e.reason());
                e.into_response()
            }
        };

        let cache = match response.headers().get(X_CACHE) {
            Some(v) if v == X_CACHE_HIT => X_CACHE_HIT,
            _ => X_CACHE_MISS,
        };
        metrics::record_request(method.as_str(), response.status().as_u16(), cache, start);

        response
    }

    async fn process(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let request_id = request_id(request.headers());

        // 1. Only idempotent reads are proxied
        if request.method() != Method::GET {
            return Err(ProxyError::MethodNotAllowed);
        }

        // 2. Allow-list, before any authorization work
        let raw_path = self
            .upstream_path(request.uri().path())
            .ok_or(ProxyError::NotFound)?
            .to_string();
        if has_encoded_delimiter(&raw_path) {
            tracing::warn!(request_id = ?request_id, path = %raw_path, "Encoded delimiter in path");
            return Err(ProxyError::InvalidPath);
        }
        let path = percent_decode_str(&raw_path)
            .decode_utf8()
            .map_err(|_| ProxyError::InvalidPath)?
            .into_owned();

        if !self.allowlist.is_allowed(&path) {
            tracing::warn!(request_id = ?request_id, path = %path, "Path not allowed");
            return Err(ProxyError::PathNotAllowed);
        }

        // 3. Upstream credential
        let token = self
            .sessions
            .bearer_token(request.headers())
            .await
            .ok_or(ProxyError::Unauthorized)?;

        // 4. Origin / referrer
        if !self.origins.is_allowed(request.headers()) {
            tracing::warn!(request_id = ?request_id, path = %path, "Origin rejected");
            return Err(ProxyError::OriginRejected);
        }

        // 5. Rate limit
        let client = self.client_ip(&request);
        if !self.rate_limiter.check(client) {
            tracing::warn!(request_id = ?request_id, client = %client, "Rate limit exceeded");
            return Err(ProxyError::RateLimited);
        }

        // 6. Cache
        let raw_params = RawParams::from_query(request.uri().query().unwrap_or(""));
        let params = flatten_params(&raw_params);
        let key = build_cache_key(Method::GET.as_str(), &path, &params);

        if let Some(entry) = self.cache.lookup(&key, &path).await {
            tracing::debug!(request_id = ?request_id, cache_key = %key, "Cache hit");
            return Ok(response::from_cache(entry));
        }

        // 7. Forward
        let job = ForwardJob {
            upstream: self.upstream.clone(),
            cache: self.cache.clone(),
            key,
            path,
            request: UpstreamRequest {
                path: raw_path,
                query: canonical_query(&params),
                token,
                request_id,
            },
        };

        match tokio::spawn(job.run()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Forward task failed");
                Err(ProxyError::UpstreamFailure)
            }
        }
    }

    /// Strip the mount prefix. `None` if the request is not under it.
    fn upstream_path<'a>(&self, request_path: &'a str) -> Option<&'a str> {
        let rest = request_path.strip_prefix(self.mount_path.as_str())?;
        (rest.starts_with('/') && rest.len() > 1).then_some(rest)
    }

    fn client_ip(&self, request: &Request<Body>) -> IpAddr {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|ip| ip.trim().parse().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

/// Upstream call plus the conditional cache write, run on its own task.
struct ForwardJob {
    upstream: Arc<dyn Upstream>,
    cache: ResponseCache,
    key: String,
    path: String,
    request: UpstreamRequest,
}

impl ForwardJob {
    async fn run(self) -> Result<Response, ProxyError> {
        let ForwardJob {
            upstream,
            cache,
            key,
            path,
            request,
        } = self;
        let start = Instant::now();
        let request_id = request.request_id.clone();

        let upstream_response = match upstream.get(request).await {
            Ok(r) => r,
            Err(UpstreamError::PathRewritten { requested, resolved }) => {
                tracing::warn!(
                    request_id = ?request_id,
                    requested = %requested,
                    resolved = %resolved,
                    "Upstream path changed by normalisation"
                );
                return Err(ProxyError::PathNotAllowed);
            }
            Err(e) => {
                tracing::error!(
                    request_id = ?request_id,
                    path = %path,
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Upstream request failed"
                );
                return Err(ProxyError::UpstreamFailure);
            }
        };

        tracing::debug!(
            request_id = ?request_id,
            path = %path,
            status = upstream_response.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        let content_type = upstream_response.content_type.as_deref().unwrap_or("");
        match cache.prepare_entry(upstream_response.status, content_type, &upstream_response.body) {
            Ok(entry) => {
                tokio::spawn(async move {
                    cache.store(&key, &path, &entry).await;
                });
            }
            Err(reason) => {
                tracing::debug!(
                    cache_key = %key,
                    status = upstream_response.status,
                    bytes = upstream_response.body.len(),
                    reason = reason.as_str(),
                    "Response not cached"
                );
                metrics::record_cache_write("skipped");
            }
        }

        Ok(response::from_upstream(upstream_response))
    }
}

/// Builder wiring collaborators into a [`ProxyHandler`].
pub struct ProxyHandlerBuilder<'a> {
    config: &'a GatewayConfig,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    upstream: Option<Arc<dyn Upstream>>,
    sessions: Option<Arc<dyn SessionProvider>>,
    origins: Option<Arc<dyn OriginValidator>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl<'a> ProxyHandlerBuilder<'a> {
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    pub fn upstream(mut self, upstream: Arc<dyn Upstream>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn origins(mut self, origins: Arc<dyn OriginValidator>) -> Self {
        self.origins = Some(origins);
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn build(self) -> Result<ProxyHandler, StartupError> {
        let config = self.config;

        let cache_backend = match self.cache_backend {
            Some(b) => b,
            None => build_backend(&config.cache)?,
        };
        let upstream: Arc<dyn Upstream> = match self.upstream {
            Some(u) => u,
            None => Arc::new(HttpUpstream::from_config(&config.upstream)?),
        };
        let sessions: Arc<dyn SessionProvider> = match self.sessions {
            Some(s) => s,
            None => Arc::new(StaticTokenSession::new(config.upstream.api_token.clone())),
        };
        let origins: Arc<dyn OriginValidator> = match self.origins {
            Some(o) => o,
            None => Arc::new(AllowedOrigins::new(&config.security.allowed_origins)),
        };
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| rate_limit::from_config(&config.rate_limit));

        Ok(ProxyHandler {
            mount_path: config.listener.mount_path.clone(),
            allowlist: PathAllowlist::new(config.allowlist.rules.clone()),
            sessions,
            origins,
            rate_limiter,
            cache: ResponseCache::from_config(cache_backend, &config.cache),
            upstream,
            trust_forwarded_for: config.security.trust_forwarded_for,
        })
    }
}
