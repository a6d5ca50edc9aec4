//! Cached response record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

pub const FIELD_BODY: &str = "body";
pub const FIELD_CONTENT_TYPE: &str = "contentType";
pub const FIELD_STATUS_CODE: &str = "statusCode";

/// A response stored under a cache key.
///
/// Field names match the hash fields written to the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub body: String,
    pub content_type: String,
    pub status_code: String,
}

impl CacheEntry {
    pub fn new(body: impl Into<String>, content_type: impl Into<String>, status: u16) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            status_code: status.to_string(),
        }
    }

    /// Parsed status code. Falls back to 200 if the stored value is unreadable.
    pub fn status(&self) -> u16 {
        self.status_code.parse().unwrap_or(200)
    }

    /// Hash fields in write order.
    pub fn to_fields(&self) -> [(&'static str, &str); 3] {
        [
            (FIELD_BODY, self.body.as_str()),
            (FIELD_CONTENT_TYPE, self.content_type.as_str()),
            (FIELD_STATUS_CODE, self.status_code.as_str()),
        ]
    }

    /// Rebuild an entry from a hash read.
    ///
    /// An empty map means the key does not exist. A map missing the body is
    /// treated as malformed.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Option<Self>, CacheError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let body = fields
            .remove(FIELD_BODY)
            .ok_or_else(|| CacheError::Malformed(format!("missing field '{}'", FIELD_BODY)))?;

        Ok(Some(Self {
            body,
            content_type: fields.remove(FIELD_CONTENT_TYPE).unwrap_or_default(),
            status_code: fields
                .remove(FIELD_STATUS_CODE)
                .unwrap_or_else(|| "200".to_string()),
        }))
    }
}
