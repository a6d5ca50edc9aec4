//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy, health and fallback handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Prune idle rate-limit state and expired cache entries in the background
//!
//! # Design Decisions
//! - The proxy mounts under a configurable prefix; everything after it is
//!   the upstream path
//! - Anything outside the mount gets a JSON 404, never a forward

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::error::ProxyError;
use crate::http::handler::ProxyHandler;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    handler: Arc<ProxyHandler>,
}

impl GatewayServer {
    /// Create a new server around an already-built handler.
    pub fn new(config: GatewayConfig, handler: Arc<ProxyHandler>) -> Self {
        let router = Self::build_router(&config, handler.clone());
        Self {
            router,
            config,
            handler,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &GatewayConfig, handler: Arc<ProxyHandler>) -> Router {
        let proxy_route = format!("{}/{{*path}}", config.listener.mount_path);

        Router::new()
            .route("/healthz", get(health))
            .route(&proxy_route, any(proxy_handler))
            .fallback(not_found)
            .with_state(handler)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_path = %self.config.listener.mount_path,
            "HTTP server starting"
        );

        let handler = self.handler.clone();
        let pruner = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                prune(&handler);
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        pruner.abort();
        tracing::info!("HTTP server stopped");
        result
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Release idle rate-limit state and expired in-process cache entries.
fn prune(handler: &ProxyHandler) {
    handler.rate_limiter().prune_idle();
    handler.cache().purge_expired();
}

async fn proxy_handler(
    State(handler): State<Arc<ProxyHandler>>,
    request: Request<Body>,
) -> Response {
    handler.handle(request).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ProxyError {
    ProxyError::NotFound
}
