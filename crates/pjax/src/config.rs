//! Navigation policy constants and their loading.
//!
//! The reserved query marker, the request header, and the link attribute are
//! policy choices rather than protocol requirements, so they live here
//! instead of being baked into the request pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PjaxError, PjaxResult};

/// Default reserved query parameter name.
pub const DEFAULT_MARKER_PARAM: &str = "_pjax";
/// Default reserved query parameter value.
pub const DEFAULT_MARKER_VALUE: &str = "true";
/// Default header flagging a navigation-fetch request.
pub const DEFAULT_HEADER_NAME: &str = "X-PJAX";
/// Default link attribute naming the target container.
pub const DEFAULT_CONTAINER_ATTRIBUTE: &str = "data-pjax";
/// Default transport timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration shared by every navigation issued from one navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PjaxConfig {
    /// Query parameter that keeps fragment responses cached apart from full pages.
    pub marker_param: String,
    /// Value sent with `marker_param`.
    pub marker_value: String,
    /// Request header identifying navigation fetches server-side.
    pub header_name: String,
    /// Value sent with `header_name`.
    pub header_value: String,
    /// Link attribute consulted when a click carries no container.
    pub container_attribute: String,
    /// Transport timeout.
    pub timeout_ms: u64,
}

impl Default for PjaxConfig {
    fn default() -> Self {
        Self {
            marker_param: DEFAULT_MARKER_PARAM.to_string(),
            marker_value: DEFAULT_MARKER_VALUE.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            header_value: "true".to_string(),
            container_attribute: DEFAULT_CONTAINER_ATTRIBUTE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PjaxConfig {
    /// Load a config from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> PjaxResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PjaxConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PJAX_*` environment variable overrides.
    pub fn with_env_overrides(self) -> PjaxResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> PjaxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PJAX_MARKER_PARAM") {
            self.marker_param = v;
        }
        if let Some(v) = lookup("PJAX_MARKER_VALUE") {
            self.marker_value = v;
        }
        if let Some(v) = lookup("PJAX_HEADER_NAME") {
            self.header_name = v;
        }
        if let Some(v) = lookup("PJAX_CONTAINER_ATTRIBUTE") {
            self.container_attribute = v;
        }
        if let Some(v) = lookup("PJAX_TIMEOUT_MS") {
            self.timeout_ms = v
                .parse()
                .map_err(|_| PjaxError::Config(format!("PJAX_TIMEOUT_MS is not a number: {v}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> PjaxResult<()> {
        if self.marker_param.is_empty() {
            return Err(PjaxError::Config("marker_param must not be empty".into()));
        }
        if self.header_name.is_empty() {
            return Err(PjaxError::Config("header_name must not be empty".into()));
        }
        Ok(())
    }

    /// The query string sent when a navigation carries no extra parameters.
    pub fn marker_query(&self) -> String {
        encode_query(&[(self.marker_param.clone(), self.marker_value.clone())])
    }
}

/// Form-encode ordered query pairs.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}
