//! Client-facing error responses.
//!
//! Every failure is a JSON object with a single `error` field. Messages are
//! fixed strings: no upstream detail, cache key or backend error text.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::http::response::{X_CACHE, X_CACHE_MISS};

/// Reasons the proxy answers without (or despite) forwarding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid request path")]
    InvalidPath,

    #[error("Path not allowed")]
    PathNotAllowed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    OriginRejected,

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream request failed")]
    UpstreamFailure,

    #[error("Not found")]
    NotFound,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::InvalidPath => StatusCode::BAD_REQUEST,
            ProxyError::PathNotAllowed => StatusCode::FORBIDDEN,
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::OriginRejected => StatusCode::FORBIDDEN,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::UpstreamFailure => StatusCode::BAD_GATEWAY,
            ProxyError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Label used for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed => "method",
            ProxyError::InvalidPath => "invalid_path",
            ProxyError::PathNotAllowed => "path",
            ProxyError::Unauthorized => "credential",
            ProxyError::OriginRejected => "origin",
            ProxyError::RateLimited => "rate_limit",
            ProxyError::UpstreamFailure => "upstream",
            ProxyError::NotFound => "not_found",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(json!({ "error": self.to_string() }))).into_response();
        response
            .headers_mut()
            .insert(X_CACHE, HeaderValue::from_static(X_CACHE_MISS));
        response
    }
}
