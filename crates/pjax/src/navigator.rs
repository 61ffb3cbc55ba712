//! The navigation request pipeline and its fallback.
//!
//! [`select_navigator`] probes the environment once and hands back either a
//! [`PjaxNavigator`], which fetches fragments and patches the page in place,
//! or a [`FallbackNavigator`], which turns every navigation into a full page
//! load. Callers keep the returned navigator for the life of the page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use url::Url;

use crate::binder::{self, BoundLink, Link};
use crate::config::{encode_query, PjaxConfig};
use crate::dom::Dom;
use crate::error::{PjaxError, PjaxResult};
use crate::events::{EventBus, FallbackReason, NavigationOutcome, PjaxEvent};
use crate::fragment::{classify, split_title};
use crate::history::{History, Location, PageviewTracker};
use crate::options::{Container, NavigationOptions, TargetUrl};
use crate::state::{url_with_query, HistoryStateRecord};
use crate::transport::{FetchRequest, FetchResponse, ReadyState, RequestHandle, Transport};

/// The collaborators a navigator drives.
#[derive(Clone)]
pub struct Environment {
    pub dom: Arc<dyn Dom>,
    pub history: Arc<dyn History>,
    pub location: Arc<dyn Location>,
    pub transport: Arc<dyn Transport>,
    pub events: Arc<EventBus>,
    pub tracker: Option<Arc<dyn PageviewTracker>>,
}

impl Environment {
    pub fn new(
        dom: Arc<dyn Dom>,
        history: Arc<dyn History>,
        location: Arc<dyn Location>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            dom,
            history,
            location,
            transport,
            events: Arc::new(EventBus::default()),
            tracker: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn PageviewTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Full navigation to `url`, announced on the event bus.
    pub(crate) fn full_navigation(&self, url: &str, reason: FallbackReason) {
        warn!(url, ?reason, "falling back to full navigation");
        self.events.emit(PjaxEvent::FullNavigation {
            url: url.to_string(),
            reason,
        });
        self.location.assign(url);
    }
}

/// One navigation strategy, chosen once per page.
pub trait Navigator: Send + Sync {
    /// Whether this navigator patches pages in place.
    fn is_supported(&self) -> bool;

    /// Perform one navigation cycle.
    ///
    /// Returns the in-flight request, or `None` when the navigation went
    /// straight to a full page load. Only configuration problems are errors.
    fn request(&self, url: TargetUrl, options: NavigationOptions)
        -> PjaxResult<Option<RequestHandle>>;

    /// Attach click interception to `link`.
    ///
    /// `container`, when given, overrides any container in `options`. A
    /// binding left without one reads it from the link's container
    /// attribute at click time.
    fn bind(
        self: Arc<Self>,
        link: Link,
        container: Option<Container>,
        options: Option<NavigationOptions>,
    ) -> PjaxResult<BoundLink>;
}

/// Pick the navigator for this environment.
pub fn select_navigator(config: PjaxConfig, env: Environment) -> Arc<dyn Navigator> {
    if env.history.supports_push_state() {
        info!("push-state available, intercepting navigations");
        Arc::new(PjaxNavigator::new(config, env))
    } else {
        info!("push-state unavailable, navigations load full pages");
        Arc::new(FallbackNavigator::new(env))
    }
}

#[derive(Default)]
struct NavigationState {
    /// Set by the first push; the priming replace happens only before it.
    push_primed: bool,
    in_flight: Option<RequestHandle>,
}

/// Fetches fragments, swaps them into the page, and writes history.
pub struct PjaxNavigator {
    config: Arc<PjaxConfig>,
    env: Environment,
    state: Arc<Mutex<NavigationState>>,
    next_id: AtomicU64,
}

impl PjaxNavigator {
    pub fn new(config: PjaxConfig, env: Environment) -> Self {
        Self {
            config: Arc::new(config),
            env,
            state: Arc::new(Mutex::new(NavigationState::default())),
            next_id: AtomicU64::new(1),
        }
    }

    fn build_request(&self, url: &str, options: &NavigationOptions) -> FetchRequest {
        let mut parameters = options.extra_parameters.clone();
        if !parameters.iter().any(|(k, _)| *k == self.config.marker_param) {
            parameters.push((
                self.config.marker_param.clone(),
                self.config.marker_value.clone(),
            ));
        }

        let mut headers = vec![(
            self.config.header_name.clone(),
            self.config.header_value.clone(),
        )];
        headers.extend(options.headers.iter().cloned());

        FetchRequest {
            url: absolute_url(&self.env.location.href(), url),
            method: options.method.clone(),
            headers,
            parameters,
        }
    }
}

impl Navigator for PjaxNavigator {
    fn is_supported(&self) -> bool {
        true
    }

    fn request(
        &self,
        url: TargetUrl,
        options: NavigationOptions,
    ) -> PjaxResult<Option<RequestHandle>> {
        let container = options.container_selector()?.to_string();
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PjaxError::NoRuntime)?;
        let url = url.resolve();

        let request = self.build_request(&url, &options);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = RequestHandle::new(id, request.clone());

        let mut state = lock(&self.state);
        if let Some(previous) = state.in_flight.take() {
            if previous.ready_state() < ReadyState::Done {
                debug!(id = previous.id(), url = %previous.request().url, "aborting stale navigation");
                previous.abort();
            }
        }

        info!(id, url = %url, container = %container, "navigation started");
        self.env.events.emit(PjaxEvent::Started {
            request_id: id,
            url: url.clone(),
            container: container.clone(),
            push: options.push,
            replace: options.replace,
        });

        let task = NavigationTask {
            handle: handle.clone(),
            url,
            container,
            options,
            config: self.config.clone(),
            env: self.env.clone(),
            state: self.state.clone(),
        };
        let join = runtime.spawn(task.run(request));
        handle.attach_task(join.abort_handle());
        state.in_flight = Some(handle.clone());

        Ok(Some(handle))
    }

    fn bind(
        self: Arc<Self>,
        link: Link,
        container: Option<Container>,
        options: Option<NavigationOptions>,
    ) -> PjaxResult<BoundLink> {
        let attribute = self.config.container_attribute.clone();
        binder::intercept(self, link, container, options, attribute)
    }
}

/// Everything one spawned navigation needs after the fetch resolves.
struct NavigationTask {
    handle: RequestHandle,
    url: String,
    container: String,
    options: NavigationOptions,
    config: Arc<PjaxConfig>,
    env: Environment,
    state: Arc<Mutex<NavigationState>>,
}

enum Settled {
    Swapped {
        response: FetchResponse,
        /// Address to report as a page view, set when history was written.
        pageview: Option<String>,
    },
    Fallback(FallbackReason),
    TransportFailed(PjaxError),
}

impl Settled {
    fn outcome(&self) -> NavigationOutcome {
        match self {
            Settled::Swapped { .. } => NavigationOutcome::Swapped,
            Settled::Fallback(reason) => NavigationOutcome::FullNavigation(*reason),
            Settled::TransportFailed(_) => {
                NavigationOutcome::FullNavigation(FallbackReason::Transport)
            }
        }
    }
}

impl NavigationTask {
    async fn run(self, request: FetchRequest) {
        self.handle.mark_loading();
        let result = self.env.transport.fetch(request).await;

        let settled = {
            let mut state = lock(&self.state);
            // A newer navigation detached this one while the fetch was pending.
            if self.handle.is_aborted() {
                debug!(id = self.handle.id(), "dropping response of detached navigation");
                return;
            }
            let settled = match result {
                Ok(response) if response.is_success() => self.apply(&mut state, response),
                Ok(response) => self.fail(PjaxError::Status {
                    status: response.status,
                    url: response.url,
                }),
                Err(e) => self.fail(e),
            };
            // Done under the lock: a later request only aborts unsettled ones.
            self.handle.mark_done();
            self.env.events.emit(PjaxEvent::Ended {
                request_id: self.handle.id(),
                url: self.url.clone(),
                outcome: settled.outcome(),
            });
            settled
        };

        // Collaborators may start navigations of their own from here on.
        if let Settled::Swapped {
            pageview: Some(url),
            ..
        } = &settled
        {
            if let Some(tracker) = &self.env.tracker {
                tracker.track_pageview(url);
            }
        }

        if self.handle.is_aborted() {
            debug!(id = self.handle.id(), "skipping callbacks of aborted navigation");
            return;
        }
        match &settled {
            Settled::Swapped { response, .. } => {
                if let Some(on_success) = &self.options.on_success {
                    on_success(response);
                }
            }
            Settled::TransportFailed(e) => {
                if let Some(on_failure) = &self.options.on_failure {
                    on_failure(e);
                }
            }
            Settled::Fallback(_) => {}
        }
        if let Some(on_complete) = &self.options.on_complete {
            on_complete(settled.outcome());
        }
    }

    /// The internal failure stage. Runs under the navigation lock.
    fn fail(&self, error: PjaxError) -> Settled {
        warn!(url = %self.url, error = %error, "navigation fetch failed");
        self.env.full_navigation(&self.url, FallbackReason::Transport);
        Settled::TransportFailed(error)
    }

    /// The internal success stage. Runs under the navigation lock.
    fn apply(&self, state: &mut NavigationState, response: FetchResponse) -> Settled {
        let env = &self.env;

        if let Some(reason) = classify(&response.body).fallback_reason() {
            env.full_navigation(&self.url, reason);
            return Settled::Fallback(reason);
        }
        if !env.dom.contains(&self.container) {
            env.full_navigation(&self.url, FallbackReason::MissingContainer);
            return Settled::Fallback(FallbackReason::MissingContainer);
        }

        let fragment = split_title(&response.body);
        if let Err(e) = env.dom.replace_content(&self.container, &fragment.markup) {
            warn!(container = %self.container, error = %e, "container swap failed");
            env.full_navigation(&self.url, FallbackReason::MissingContainer);
            return Settled::Fallback(FallbackReason::MissingContainer);
        }

        let old_title = env.dom.title();
        if let Some(title) = &fragment.title {
            env.dom.set_title(title);
        }
        let new_title = env.dom.title();

        let query = encode_query(&self.handle.request().parameters);
        let replay_url =
            (query != self.config.marker_query()).then(|| url_with_query(&self.url, &query));
        let record = HistoryStateRecord::new(self.container.clone()).with_url(replay_url);

        let mut mutated = false;
        if self.options.replace {
            env.history
                .replace_state(record.to_value(), &new_title, Some(&self.url));
            mutated = true;
        } else if self.options.push {
            if !state.push_primed {
                env.history
                    .replace_state(record.without_url().to_value(), &old_title, None);
                state.push_primed = true;
            }
            env.history
                .push_state(record.to_value(), &new_title, Some(&self.url));
            mutated = true;
        }

        let hash = env.location.hash();
        if !hash.is_empty() {
            env.location.set_hash("");
            env.location.set_hash(&hash);
        }

        debug!(url = %self.url, container = %self.container, title = %new_title, "container swapped");
        Settled::Swapped {
            response,
            pageview: mutated.then(|| self.url.clone()),
        }
    }
}

/// Navigator for environments without push-state: every navigation is a full load.
pub struct FallbackNavigator {
    env: Environment,
}

impl FallbackNavigator {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }
}

impl Navigator for FallbackNavigator {
    fn is_supported(&self) -> bool {
        false
    }

    fn request(
        &self,
        url: TargetUrl,
        _options: NavigationOptions,
    ) -> PjaxResult<Option<RequestHandle>> {
        let url = url.resolve();
        self.env.full_navigation(&url, FallbackReason::Unsupported);
        Ok(None)
    }

    fn bind(
        self: Arc<Self>,
        link: Link,
        _container: Option<Container>,
        _options: Option<NavigationOptions>,
    ) -> PjaxResult<BoundLink> {
        Ok(BoundLink::passive(link))
    }
}

fn lock(state: &Mutex<NavigationState>) -> MutexGuard<'_, NavigationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve `url` against the current address for the transport.
fn absolute_url(base: &str, url: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(url))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
