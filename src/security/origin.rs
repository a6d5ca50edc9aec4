//! Origin / referrer consistency check.

use axum::http::{header, HeaderMap};
use url::Url;

/// Decides whether a request comes from a page allowed to use the proxy.
pub trait OriginValidator: Send + Sync {
    fn is_allowed(&self, headers: &HeaderMap) -> bool;
}

/// Validator backed by a fixed list of origins (`scheme://host[:port]`).
///
/// An empty list disables the check. Otherwise the `Origin` header must be
/// listed; without `Origin`, the origin of the `Referer` URL must be listed.
/// A request carrying neither header is rejected.
#[derive(Debug, Clone, Default)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(|o| o.as_ref().trim_end_matches('/').to_ascii_lowercase())
                .collect(),
        }
    }

    fn contains(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/').to_ascii_lowercase();
        self.origins.iter().any(|allowed| *allowed == origin)
    }
}

impl OriginValidator for AllowedOrigins {
    fn is_allowed(&self, headers: &HeaderMap) -> bool {
        if self.origins.is_empty() {
            return true;
        }

        if let Some(origin) = headers.get(header::ORIGIN) {
            return origin.to_str().map(|o| self.contains(o)).unwrap_or(false);
        }

        headers
            .get(header::REFERER)
            .and_then(|r| r.to_str().ok())
            .and_then(|r| Url::parse(r).ok())
            .map(|url| self.contains(&url.origin().ascii_serialization()))
            .unwrap_or(false)
    }
}
