//! A headless browsing session: one page, one history, live HTTP.
//!
//! The session plays the part of the browser around the library. It performs
//! the full page loads the navigator asks for and dispatches popstate events
//! when the user moves through history.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use tokio::sync::broadcast::{self, error::TryRecvError};

use pjax::{
    select_navigator, ClickEvent, Container, Dom, Environment, EventBus, FetchRequest,
    HistoryEntry, HistoryListener, HtmlPage, Link, Location, Navigator, PjaxConfig, PjaxEvent,
    PopOutcome, PopStateEvent, ReqwestTransport, SessionHistory, Transport,
};

/// What a history traversal did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// The entry was restored through a navigation fetch.
    Replayed,
    /// The entry was loaded as a whole page.
    FullLoad,
    /// The event was the load-time popstate and was dropped.
    Ignored,
}

/// A headless tab with pjax wired in.
pub struct BrowserSession {
    config: PjaxConfig,
    default_container: String,
    page: Arc<HtmlPage>,
    history: Arc<SessionHistory>,
    transport: Arc<ReqwestTransport>,
    env: Environment,
    navigator: Arc<dyn Navigator>,
    listener: HistoryListener,
    events: broadcast::Receiver<PjaxEvent>,
}

impl BrowserSession {
    /// Load `url` as a full page and set pjax up on it.
    ///
    /// `default_container` is used for links without a container attribute.
    pub async fn open(
        url: &str,
        config: PjaxConfig,
        default_container: &str,
    ) -> anyhow::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.timeout_ms));
        let response = transport.fetch(FetchRequest::get(url)).await?;
        tracing::info!(url = %response.url, status = response.status, "opened");

        let page = Arc::new(HtmlPage::parse(&response.url, &response.body));
        let history = Arc::new(SessionHistory::new(&response.url));
        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();
        let env = Environment::new(
            page.clone(),
            history.clone(),
            history.clone(),
            transport.clone(),
        )
        .with_events(bus);
        let navigator = select_navigator(config.clone(), env.clone());
        let listener = HistoryListener::new(navigator.clone(), &env);

        Ok(Self {
            config,
            default_container: default_container.to_string(),
            page,
            history,
            transport,
            env,
            navigator,
            listener,
            events,
        })
    }

    pub fn config(&self) -> &PjaxConfig {
        &self.config
    }

    pub fn url(&self) -> String {
        self.history.href()
    }

    pub fn title(&self) -> String {
        self.page.title()
    }

    pub fn links(&self) -> Vec<Link> {
        self.page.links()
    }

    pub fn history(&self) -> (Vec<HistoryEntry>, usize) {
        (self.history.entries(), self.history.index())
    }

    /// Inner markup of `selector`, or of the default container.
    pub fn show(&self, selector: Option<&str>) -> Option<String> {
        self.page.inner_html(selector.unwrap_or(&self.default_container))
    }

    /// The container a link targets.
    pub fn container_for(&self, link: &Link) -> String {
        link.attribute(&self.config.container_attribute)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.default_container)
            .to_string()
    }

    /// Primary-click link `index` (zero-based, document order) and wait for
    /// the navigation to settle.
    pub async fn click(&mut self, index: usize) -> anyhow::Result<Link> {
        let links = self.links();
        let link = links.get(index).cloned().ok_or_else(|| {
            anyhow!("no link #{} on this page ({} links)", index + 1, links.len())
        })?;
        let container = self.container_for(&link);

        let bound = self
            .navigator
            .clone()
            .bind(link.clone(), Some(Container::selector(container)), None)?;
        let outcome = bound.click(&ClickEvent::primary())?;
        match outcome.request() {
            Some(handle) => handle.finished().await,
            // A link left to its default action is followed as a full load.
            None if !outcome.default_prevented() => self.history.assign(&link.href),
            None => {}
        }

        self.settle().await?;
        Ok(link)
    }

    pub async fn back(&mut self) -> anyhow::Result<Traversal> {
        match self.history.back() {
            Some(event) => self.pop(event).await,
            None => bail!("already at the first history entry"),
        }
    }

    pub async fn forward(&mut self) -> anyhow::Result<Traversal> {
        match self.history.forward() {
            Some(event) => self.pop(event).await,
            None => bail!("already at the last history entry"),
        }
    }

    /// Events emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<PjaxEvent> {
        let mut drained = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => drained.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log overflowed");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        drained
    }

    async fn pop(&mut self, event: PopStateEvent) -> anyhow::Result<Traversal> {
        let traversal = match self.listener.on_popstate(&event)? {
            PopOutcome::IgnoredInitial => Traversal::Ignored,
            PopOutcome::Replayed(Some(handle)) => {
                handle.finished().await;
                Traversal::Replayed
            }
            PopOutcome::Replayed(None) | PopOutcome::Reloaded => Traversal::FullLoad,
            PopOutcome::Unrecognized => {
                // Entries written by full loads belong to another document.
                let url = self.history.href();
                self.full_load(&url).await?;
                Traversal::FullLoad
            }
        };
        self.settle().await?;
        Ok(traversal)
    }

    /// Perform every full load the navigator requested.
    async fn settle(&mut self) -> anyhow::Result<()> {
        for load in self.history.take_pending_loads() {
            tracing::debug!(?load, "performing full load");
            self.full_load(load.url()).await?;
        }
        Ok(())
    }

    async fn full_load(&mut self, url: &str) -> anyhow::Result<()> {
        let response = self.transport.fetch(FetchRequest::get(url)).await?;
        self.page.load(&response.url, &response.body);

        // A new document starts with fresh navigation state.
        self.navigator = select_navigator(self.config.clone(), self.env.clone());
        self.listener = HistoryListener::new(self.navigator.clone(), &self.env);
        Ok(())
    }
}
