//! Cache key derivation.
//!
//! Keys have the shape `scix:cache:<METHOD>:<path>[?<query>]` where the
//! query is built from the normalized parameters sorted by name, with every
//! name and value percent-encoded independently. Two parameter maps holding
//! the same pairs always produce the same key, whatever their iteration order.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::cache::params::NormalizedParams;

/// Prefix separating gateway entries from other users of the same store.
pub const CACHE_NAMESPACE: &str = "scix:cache";

/// URI component escaping: everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Build the sorted, encoded query string for a parameter map.
///
/// Returns an empty string when there are no parameters.
pub fn canonical_query(params: &NormalizedParams) -> String {
    let mut pairs: Vec<(&str, &str)> = params.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Derive the cache key for a request.
pub fn build_cache_key(method: &str, path: &str, params: &NormalizedParams) -> String {
    let method = method.to_uppercase();
    let query = canonical_query(params);

    if query.is_empty() {
        format!("{}:{}:{}", CACHE_NAMESPACE, method, path)
    } else {
        format!("{}:{}:{}?{}", CACHE_NAMESPACE, method, path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    fn params(pairs: &[(&str, &str)]) -> NormalizedParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_key_independent_of_order() {
        let p1 = params(&[("z", "last"), ("a", "first"), ("m", "mid")]);
        let p2 = params(&[("m", "mid"), ("z", "last"), ("a", "first")]);

        let k1 = build_cache_key("GET", "/resolver", &p1);
        let k2 = build_cache_key("GET", "/resolver", &p2);

        assert_eq!(k1, "scix:cache:GET:/resolver?a=first&m=mid&z=last");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_empty_params_omit_query() {
        let key = build_cache_key("GET", "/search/query", &NormalizedParams::default());
        assert_eq!(key, "scix:cache:GET:/search/query");
        assert!(!key.ends_with('?'));
    }

    #[test]
    fn test_method_is_upper_cased() {
        let key = build_cache_key("get", "/search/query", &params(&[("q", "star")]));
        assert_eq!(key, "scix:cache:GET:/search/query?q=star");
    }

    #[test]
    fn test_special_characters_are_encoded() {
        let key = build_cache_key(
            "GET",
            "/search/query",
            &params(&[("q", "title:\"black hole\" / 🚀"), ("fq", "a&b=c")]),
        );
        assert_eq!(
            key,
            "scix:cache:GET:/search/query?fq=a%26b%3Dc&q=title%3A%22black%20hole%22%20%2F%20%F0%9F%9A%80"
        );
    }

    #[test]
    fn test_unreserved_characters_left_intact() {
        assert_eq!(encode_component("AZaz09-_.!~*'()"), "AZaz09-_.!~*'()");
        assert_eq!(encode_component("a b?c#d%"), "a%20b%3Fc%23d%25");
    }

    #[test]
    fn test_encoding_decodes_back_exactly() {
        for raw in ["a/b", "space here", "ünïcödé", "🚀 launch", "x&y=z", "%41"] {
            let encoded = encode_component(raw);
            let decoded = percent_decode_str(&encoded).decode_utf8().unwrap();
            assert_eq!(decoded, raw);
        }
    }

    #[test]
    fn test_literal_delimiters_do_not_collide() {
        // One parameter whose value contains "&b=2" vs two parameters.
        let single = build_cache_key("GET", "/search/query", &params(&[("a", "1&b=2")]));
        let double = build_cache_key("GET", "/search/query", &params(&[("a", "1"), ("b", "2")]));
        assert_ne!(single, double);
    }

    #[test]
    fn test_control_characters_are_encodable() {
        let key = build_cache_key("GET", "/search/query", &params(&[("q", "\u{0}\n\t")]));
        assert_eq!(key, "scix:cache:GET:/search/query?q=%00%0A%09");
    }

    #[test]
    fn test_repeated_derivation_is_stable() {
        let p = params(&[("rows", "10"), ("q", "star"), ("fl", "bibcode,title"), ("start", "0")]);
        let first = build_cache_key("GET", "/search/query", &p);
        for _ in 0..100 {
            assert_eq!(build_cache_key("GET", "/search/query", &p), first);
        }
    }

    #[test]
    fn test_canonical_query_matches_key_suffix() {
        let p = params(&[("q", "star"), ("fl", "bibcode,title")]);
        let query = canonical_query(&p);
        assert_eq!(query, "fl=bibcode%2Ctitle&q=star");
        assert!(build_cache_key("GET", "/search/query", &p).ends_with(&query));
    }
}
