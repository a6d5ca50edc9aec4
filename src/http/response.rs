//! Response construction for cache hits and upstream responses.
//!
//! # Responsibilities
//! - Turn a cache entry or upstream response into a client response
//! - Propagate status and content type verbatim
//! - Tag every response with `X-Cache`

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::cache::CacheEntry;
use crate::upstream::UpstreamResponse;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHE_HIT: &str = "HIT";
pub const X_CACHE_MISS: &str = "MISS";

fn build(status: u16, content_type: Option<&str>, body: Body, cache: &'static str) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);

    let headers = response.headers_mut();
    if let Some(value) = content_type
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static(cache));
    response
}

/// Response served from the cache.
pub fn from_cache(entry: CacheEntry) -> Response {
    let status = entry.status();
    build(
        status,
        Some(entry.content_type.as_str()),
        Body::from(entry.body),
        X_CACHE_HIT,
    )
}

/// Response served from the upstream.
pub fn from_upstream(upstream: UpstreamResponse) -> Response {
    build(
        upstream.status,
        upstream.content_type.as_deref(),
        Body::from(upstream.body),
        X_CACHE_MISS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Bytes};

    #[tokio::test]
    async fn test_from_cache_is_verbatim() {
        let response = from_cache(CacheEntry::new("{\"a\":1}", "application/json; charset=utf-8", 203));
        assert_eq!(response.status(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(response.headers()[X_CACHE], "HIT");
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_from_upstream_passes_errors_through() {
        let response = from_upstream(UpstreamResponse {
            status: 500,
            content_type: Some("text/plain".into()),
            body: Bytes::from_static(b"boom"),
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[X_CACHE], "MISS");
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"boom");
    }

    #[test]
    fn test_missing_content_type_is_omitted() {
        let response = from_upstream(UpstreamResponse {
            status: 204,
            content_type: None,
            body: Bytes::new(),
        });
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());

        let response = from_cache(CacheEntry::new("", "", 200));
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }
}
