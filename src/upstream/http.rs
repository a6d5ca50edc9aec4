//! reqwest-backed upstream client.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use url::Url;

use crate::config::UpstreamConfig;
use crate::upstream::{Upstream, UpstreamError, UpstreamRequest, UpstreamResponse};

/// Forwards requests to the configured upstream base URL.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(
            base_url = %base_url,
            timeout_secs = config.timeout_secs,
            "Upstream client configured"
        );

        Ok(Self::new(client, base_url))
    }

    /// Join `path` and `query` onto the base URL.
    ///
    /// Fails if normalisation (dot segments and the like) changes the path.
    pub fn resolve_url(&self, path: &str, query: &str) -> Result<Url, UpstreamError> {
        let expected = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);

        let mut url = self.base_url.clone();
        url.set_path(&expected);
        url.set_query((!query.is_empty()).then_some(query));

        let requested = percent_decode_str(&expected).decode_utf8_lossy();
        let resolved = percent_decode_str(url.path()).decode_utf8_lossy();
        if requested != resolved {
            return Err(UpstreamError::PathRewritten {
                requested: requested.into_owned(),
                resolved: resolved.into_owned(),
            });
        }

        Ok(url)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.resolve_url(&request.path, &request.query)?;

        let mut builder = self
            .client
            .get(url)
            .bearer_auth(&request.token)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(id) = &request.request_id {
            builder = builder.header("x-request-id", id.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(base: &str) -> HttpUpstream {
        HttpUpstream::new(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn test_resolve_joins_base_path() {
        let up = upstream("https://api.example.org/v1");
        let url = up.resolve_url("/search/query", "q=star&rows=10").unwrap();
        assert_eq!(url.as_str(), "https://api.example.org/v1/search/query?q=star&rows=10");

        let up = upstream("https://api.example.org/v1/");
        let url = up.resolve_url("/resolver/2024A&A...1A/esources", "").unwrap();
        assert_eq!(url.as_str(), "https://api.example.org/v1/resolver/2024A&A...1A/esources");
    }

    #[test]
    fn test_resolve_keeps_encoded_query() {
        let up = upstream("https://api.example.org");
        let url = up.resolve_url("/search/query", "q=a%20b%26c").unwrap();
        assert_eq!(url.query(), Some("q=a%20b%26c"));
    }

    #[test]
    fn test_resolve_rejects_encoded_dot_segments() {
        let up = upstream("https://api.example.org/v1");
        let err = up.resolve_url("/resolver/%2e%2e/accounts/bootstrap", "").unwrap_err();
        assert!(matches!(err, UpstreamError::PathRewritten { .. }));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = UpstreamConfig {
            base_url: "not a url".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(
            HttpUpstream::from_config(&config),
            Err(UpstreamError::InvalidUrl(_))
        ));
    }
}
