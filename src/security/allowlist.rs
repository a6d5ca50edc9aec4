//! Upstream path allow-list.
//!
//! # Responsibilities
//! - Decide whether a request path may be forwarded upstream at all
//! - Reject parent-directory traversal before any rule is consulted
//! - Reject raw paths whose percent-encoding hides a path or query delimiter
//!
//! # Design Decisions
//! - Default deny: new upstream endpoints must be added explicitly
//! - Rules are plain data (exact / prefix), evaluated in order
//! - No regex to guarantee O(n) matching

use serde::{Deserialize, Serialize};

/// A single allow-list rule.
///
/// In TOML: `{ exact = "/search/query" }` or `{ prefix = "/resolver/" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRule {
    /// Matches the path exactly.
    Exact(String),
    /// Matches paths that start with the prefix and have at least one more
    /// character after it.
    Prefix(String),
}

impl PathRule {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Exact(expected) => path == expected,
            PathRule::Prefix(prefix) => path.len() > prefix.len() && path.starts_with(prefix.as_str()),
        }
    }
}

/// Endpoints the gateway forwards by default.
pub fn default_rules() -> Vec<PathRule> {
    vec![
        PathRule::Exact("/search/query".to_string()),
        PathRule::Prefix("/resolver/".to_string()),
    ]
}

/// Encodings of `/`, `?`, `#` and `\`. Decoding any of them yields a path
/// that differs from the one forwarded upstream.
const ENCODED_DELIMITERS: [&str; 4] = ["%2f", "%3f", "%23", "%5c"];

/// Returns true if the raw (still encoded) path contains an encoded
/// delimiter, in either case.
pub fn has_encoded_delimiter(raw_path: &str) -> bool {
    let lower = raw_path.to_ascii_lowercase();
    ENCODED_DELIMITERS.iter().any(|d| lower.contains(d))
}

/// Ordered, default-deny list of forwardable paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAllowlist {
    rules: Vec<PathRule>,
}

impl PathAllowlist {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self { rules }
    }

    /// Returns true if `path` may be forwarded.
    pub fn is_allowed(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }

        // Traversal is rejected even when a broad prefix rule would match.
        if path.split('/').any(|segment| segment == "..") {
            return false;
        }

        self.rules.iter().any(|rule| rule.matches(path))
    }
}

impl Default for PathAllowlist {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let allowlist = PathAllowlist::default();
        assert!(allowlist.is_allowed("/search/query"));
        assert!(allowlist.is_allowed("/resolver/2024ApJ...123A/esources"));
        assert!(!allowlist.is_allowed("/accounts/bootstrap"));
        assert!(!allowlist.is_allowed(""));
    }

    #[test]
    fn test_encoded_delimiters_detected() {
        assert!(has_encoded_delimiter("/resolver/X%3Fa=1"));
        assert!(has_encoded_delimiter("/resolver/a%2Fb"));
        assert!(has_encoded_delimiter("/resolver/a%2fb"));
        assert!(has_encoded_delimiter("/resolver/a%23b"));
        assert!(has_encoded_delimiter("/resolver/a%5Cb"));
        assert!(!has_encoded_delimiter("/resolver/2024ApJ...123A/esources"));
        assert!(!has_encoded_delimiter("/resolver/a%20b"));
        assert!(!has_encoded_delimiter("/resolver/a%252Fb"));
    }

    #[test]
    fn test_traversal_rejected_before_matching() {
        let allowlist = PathAllowlist::default();
        assert!(!allowlist.is_allowed("/search/query/../accounts/bootstrap"));
        assert!(!allowlist.is_allowed("/resolver/../accounts/bootstrap"));
        assert!(!allowlist.is_allowed("/resolver/x/.."));
    }

    #[test]
    fn test_dots_inside_segments_are_not_traversal() {
        let allowlist = PathAllowlist::default();
        assert!(allowlist.is_allowed("/resolver/2024A&A...680A..12B"));
        assert!(allowlist.is_allowed("/resolver/.../x"));
    }

    #[test]
    fn test_exact_rule_is_exact() {
        let allowlist = PathAllowlist::default();
        assert!(!allowlist.is_allowed("/search/query/"));
        assert!(!allowlist.is_allowed("/search/queryx"));
        assert!(!allowlist.is_allowed("/search/bigquery"));
        assert!(!allowlist.is_allowed("/SEARCH/QUERY"));
    }

    #[test]
    fn test_prefix_rule_requires_sub_resource() {
        let allowlist = PathAllowlist::default();
        assert!(!allowlist.is_allowed("/resolver"));
        assert!(!allowlist.is_allowed("/resolver/"));
        assert!(allowlist.is_allowed("/resolver/x"));
        assert!(!allowlist.is_allowed("/api/resolver/x"));
    }

    #[test]
    fn test_custom_rules() {
        let allowlist = PathAllowlist::new(vec![PathRule::Exact("/metrics/".into())]);
        assert!(allowlist.is_allowed("/metrics/"));
        assert!(!allowlist.is_allowed("/search/query"));
        assert!(!PathAllowlist::new(Vec::new()).is_allowed("/search/query"));
    }

    #[test]
    fn test_rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            rules: Vec<PathRule>,
        }
        let doc: Doc = toml::from_str(
            r#"rules = [{ exact = "/search/query" }, { prefix = "/resolver/" }]"#,
        )
        .unwrap();
        assert_eq!(doc.rules, default_rules());
    }
}
