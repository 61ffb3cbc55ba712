//! Back/forward handling.
//!
//! Older browsers fire a popstate on page load that does not correspond to any
//! user navigation. Those browsers have no `state` property on history. When
//! the property is missing, the listener swallows exactly one popstate that
//! arrives while the address is still the load-time address.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::dom::Dom;
use crate::error::PjaxResult;
use crate::events::{EventBus, FallbackReason, PjaxEvent};
use crate::history::{Location, PopStateEvent};
use crate::navigator::{Environment, Navigator};
use crate::options::{NavigationOptions, TargetUrl};
use crate::state::HistoryStateRecord;
use crate::transport::RequestHandle;

/// What a popstate event led to.
#[derive(Debug)]
pub enum PopOutcome {
    /// The spurious initial popstate, swallowed.
    IgnoredInitial,
    /// The recorded navigation was re-issued without touching history.
    Replayed(Option<RequestHandle>),
    /// The recorded container is gone; the current address was reloaded.
    Reloaded,
    /// The entry was not written by this crate.
    Unrecognized,
}

/// Replays navigations when the user moves through history.
pub struct HistoryListener {
    navigator: Arc<dyn Navigator>,
    dom: Arc<dyn Dom>,
    location: Arc<dyn Location>,
    events: Arc<EventBus>,
    initial_url: String,
    popped: AtomicBool,
}

impl HistoryListener {
    /// Create the listener at page load.
    pub fn new(navigator: Arc<dyn Navigator>, env: &Environment) -> Self {
        Self {
            navigator,
            dom: env.dom.clone(),
            location: env.location.clone(),
            events: env.events.clone(),
            initial_url: env.location.href(),
            // Only browsers without a state property fire the load-time popstate.
            popped: AtomicBool::new(env.history.exposes_state()),
        }
    }

    /// Handle one popstate event.
    pub fn on_popstate(&self, event: &PopStateEvent) -> PjaxResult<PopOutcome> {
        let href = self.location.href();
        let first = !self.popped.swap(true, Ordering::SeqCst);
        if first && href == self.initial_url {
            debug!(url = %href, "ignoring initial popstate");
            return Ok(PopOutcome::IgnoredInitial);
        }

        let Some(record) = HistoryStateRecord::from_value(&event.state) else {
            return Ok(PopOutcome::Unrecognized);
        };

        if !self.dom.contains(&record.container) {
            info!(url = %href, container = %record.container, "container gone, reloading");
            self.events.emit(PjaxEvent::FullNavigation {
                url: href,
                reason: FallbackReason::StaleHistory,
            });
            self.location.reload();
            return Ok(PopOutcome::Reloaded);
        }

        let url = record.url.unwrap_or(href);
        info!(url = %url, container = %record.container, "replaying navigation");
        self.events.emit(PjaxEvent::Replayed {
            url: url.clone(),
            container: record.container.clone(),
        });
        let options = NavigationOptions::new(record.container)
            .push(false)
            .replace(false);
        let handle = self.navigator.request(TargetUrl::from(url), options)?;
        Ok(PopOutcome::Replayed(handle))
    }
}
