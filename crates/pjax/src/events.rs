//! Navigation event bus: "started" and "ended" notifications.
//!
//! The [`EventBus`] is a `tokio::sync::broadcast` channel carrying
//! [`PjaxEvent`] values. Loading indicators, analytics, and tests subscribe
//! independently. When no subscribers exist, events are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why a navigation gave up on the in-page swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The response body was empty or whitespace.
    EmptyBody,
    /// The response was a whole document rather than a fragment.
    FullDocument,
    /// The target container is not in the page.
    MissingContainer,
    /// Network error, timeout, or non-2xx status.
    Transport,
    /// History push-state is unavailable.
    Unsupported,
    /// A history entry referenced a container the page no longer has.
    StaleHistory,
}

/// How a navigation that ran to completion ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Container content was replaced in place.
    Swapped,
    /// The page was sent on a full navigation instead.
    FullNavigation(FallbackReason),
}

/// Every event the navigator emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PjaxEvent {
    /// A navigation-fetch request is about to be issued.
    Started {
        request_id: u64,
        url: String,
        container: String,
        push: bool,
        replace: bool,
    },
    /// A navigation-fetch request finished (not emitted for cancelled requests).
    Ended {
        request_id: u64,
        url: String,
        outcome: NavigationOutcome,
    },
    /// The whole page is being navigated instead of patched.
    FullNavigation { url: String, reason: FallbackReason },
    /// A back/forward navigation is being replayed.
    Replayed { url: String, container: String },
}

/// The process-wide notification channel.
pub struct EventBus {
    sender: broadcast::Sender<PjaxEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: PjaxEvent) {
        tracing::trace!(?event, "pjax event");
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<PjaxEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
