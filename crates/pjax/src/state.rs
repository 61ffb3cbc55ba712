//! The payload written into each history entry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State record stored alongside a history entry so back/forward can replay it.
///
/// Serialized as `{"pjax": "<selector>", "url": "<url>" | null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStateRecord {
    /// Selector of the container the entry's content was swapped into.
    #[serde(rename = "pjax")]
    pub container: String,
    /// Exact fetched URL, recorded only when extra query parameters were sent.
    #[serde(default)]
    pub url: Option<String>,
}

impl HistoryStateRecord {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// A copy with the URL explicitly nulled out.
    pub fn without_url(&self) -> Self {
        Self {
            container: self.container.clone(),
            url: None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Recognize a state object written by this crate.
    ///
    /// Returns `None` for any other payload, including records whose
    /// container is not a non-empty string.
    pub fn from_value(value: &Value) -> Option<Self> {
        let record: HistoryStateRecord = serde_json::from_value(value.clone()).ok()?;
        if record.container.is_empty() {
            return None;
        }
        Some(record)
    }
}

/// Reconstruct the exact URL a navigation fetched.
///
/// Joins with `&` when `url` already carries a query, `?` otherwise.
pub fn url_with_query(url: &str, query: &str) -> String {
    let joiner = if url.contains('?') { '&' } else { '?' };
    format!("{url}{joiner}{query}")
}
