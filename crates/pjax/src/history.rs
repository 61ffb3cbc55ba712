//! History, location, and analytics capabilities.

use serde_json::Value;

/// Session history as exposed to scripts.
pub trait History: Send + Sync {
    /// Capability probe: without push-state the navigator degrades to full loads.
    fn supports_push_state(&self) -> bool;
    /// Capability probe: whether history carries a `state` property at all.
    /// Browsers that have one never fire a popstate on page load.
    fn exposes_state(&self) -> bool;
    /// Append an entry. `url` of `None` keeps the current address.
    fn push_state(&self, state: Value, title: &str, url: Option<&str>);
    /// Overwrite the current entry. `url` of `None` keeps the current address.
    fn replace_state(&self, state: Value, title: &str, url: Option<&str>);
}

/// The page address.
pub trait Location: Send + Sync {
    fn href(&self) -> String;
    /// Fragment identifier including the leading `#`, or empty.
    fn hash(&self) -> String;
    fn set_hash(&self, hash: &str);
    /// Full navigation to `url`.
    fn assign(&self, url: &str);
    /// Full reload of the current address.
    fn reload(&self);
}

/// Optional page-view analytics, notified once per history mutation.
pub trait PageviewTracker: Send + Sync {
    fn track_pageview(&self, url: &str);
}

/// Back/forward notification carrying the state stored with the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PopStateEvent {
    pub state: Value,
}

impl PopStateEvent {
    pub fn new(state: Value) -> Self {
        Self { state }
    }
}
