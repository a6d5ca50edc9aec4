//! Query parameter normalization.
//!
//! # Responsibilities
//! - Model the loosely typed query bag (scalar, list, or absent per name)
//! - Flatten it into a strict name → string map for key building
//!
//! # Design Decisions
//! - `flatten_params` is the only place where list/absent values are resolved
//! - Lists are joined with `,`, absent values are dropped (never `""`)
//! - No trimming or case folding: names and values pass through untouched

use std::collections::HashMap;

/// Delimiter used when flattening list values.
pub const LIST_DELIMITER: &str = ",";

/// A single raw parameter value before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// A scalar value.
    Single(String),
    /// A list value; flattened with [`LIST_DELIMITER`].
    Multi(Vec<String>),
    /// A missing value; dropped during normalization.
    Absent,
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl<S: Into<String>> From<Vec<S>> for ParamValue {
    fn from(values: Vec<S>) -> Self {
        ParamValue::Multi(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Absent)
    }
}

/// The raw parameter bag, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams {
    entries: Vec<(String, ParamValue)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// Repeated names collect into a list in order of appearance.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::new();
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match params.entries.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => {
                    let previous = std::mem::replace(existing, ParamValue::Absent);
                    *existing = match previous {
                        ParamValue::Single(first) => ParamValue::Multi(vec![first, value]),
                        ParamValue::Multi(mut values) => {
                            values.push(value);
                            ParamValue::Multi(values)
                        }
                        ParamValue::Absent => ParamValue::Single(value),
                    };
                }
                None => params
                    .entries
                    .push((name.into_owned(), ParamValue::Single(value))),
            }
        }
        params
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// Flattened parameters: every value is a single string.
///
/// Iteration order is unspecified; the key builder sorts explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedParams {
    inner: HashMap<String, String>,
}

impl NormalizedParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NormalizedParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Flatten a raw parameter bag into [`NormalizedParams`].
pub fn flatten_params(raw: &RawParams) -> NormalizedParams {
    raw.iter()
        .filter_map(|(name, value)| {
            let flat = match value {
                ParamValue::Single(v) => v.clone(),
                ParamValue::Multi(values) => values.join(LIST_DELIMITER),
                ParamValue::Absent => return None,
            };
            Some((name.to_string(), flat))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_list_values() {
        let raw: RawParams = [("fl", vec!["bibcode", "title", "author"])].into_iter().collect();
        let flat = flatten_params(&raw);
        assert_eq!(flat.get("fl"), Some("bibcode,title,author"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_flatten_empty_and_single_lists() {
        let mut raw = RawParams::new();
        raw.insert("fl", Vec::<String>::new());
        raw.insert("sort", vec!["date desc"]);
        let flat = flatten_params(&raw);
        assert_eq!(flat.get("fl"), Some(""));
        assert_eq!(flat.get("sort"), Some("date desc"));
    }

    #[test]
    fn test_absent_values_are_dropped() {
        let mut raw = RawParams::new();
        raw.insert("fl", None::<String>);
        raw.insert("q", "star");
        let flat = flatten_params(&raw);
        assert!(!flat.contains("fl"));
        assert_eq!(flat.get("q"), Some("star"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_no_trimming_or_case_changes() {
        let raw: RawParams = [("Q", "  Mixed Case  ")].into_iter().collect();
        let flat = flatten_params(&raw);
        assert_eq!(flat.get("Q"), Some("  Mixed Case  "));
        assert!(!flat.contains("q"));
    }

    #[test]
    fn test_from_query_collects_repeated_names() {
        let raw = RawParams::from_query("q=star&fl=bibcode&fl=title&rows");
        let flat = flatten_params(&raw);
        assert_eq!(flat.get("q"), Some("star"));
        assert_eq!(flat.get("fl"), Some("bibcode,title"));
        assert_eq!(flat.get("rows"), Some(""));
    }

    #[test]
    fn test_from_query_decodes_form_encoding() {
        let raw = RawParams::from_query("q=author%3A%22Smith%2C+J%22");
        let flat = flatten_params(&raw);
        assert_eq!(flat.get("q"), Some("author:\"Smith, J\""));
    }
}
