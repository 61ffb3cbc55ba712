//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use url::Url;

use pjax::{
    select_navigator, Dom, Environment, EventBus, FetchRequest, FetchResponse, HtmlPage,
    Navigator, PageviewTracker, PjaxConfig, PjaxError, PjaxResult, SessionHistory, Transport,
};

pub const ORIGIN: &str = "http://site.test";

pub const PAGE: &str = r##"<!DOCTYPE html>
<html><head><title>Home</title></head>
<body>
  <nav>
    <a href="/foo" data-pjax="#main">Foo</a>
    <a href="/bar">Bar</a>
  </nav>
  <div id="main"><p>home</p></div>
</body></html>"##;

/// How the stub answers one path.
#[derive(Clone)]
pub enum Reply {
    Body(u16, String),
    Error,
    /// Answer only after the gate is opened.
    Gated(Arc<Notify>, String),
}

/// Transport answering from a fixed route table and recording every request.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl StubTransport {
    pub fn route(&self, path: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(path.to_string(), reply);
    }

    pub fn ok(&self, path: &str, body: &str) {
        self.route(path, Reply::Body(200, body.to_string()));
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        while self.requests().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, request: FetchRequest) -> PjaxResult<FetchResponse> {
        let path = Url::parse(&request.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| request.url.clone());
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.routes.lock().unwrap().get(&path).cloned();

        let (status, body) = match reply {
            Some(Reply::Body(status, body)) => (status, body),
            Some(Reply::Gated(gate, body)) => {
                gate.notified().await;
                (200, body)
            }
            Some(Reply::Error) => {
                return Err(PjaxError::Config(format!("connection refused: {path}")))
            }
            None => (404, String::new()),
        };
        if !(200..300).contains(&status) {
            return Err(PjaxError::Status {
                status,
                url: request.url,
            });
        }
        Ok(FetchResponse {
            url: request.url,
            status,
            headers: vec![("content-type".into(), "text/html".into())],
            body,
        })
    }
}

/// Page-view tracker counting notifications.
#[derive(Default)]
pub struct RecordingTracker {
    pub pageviews: Mutex<Vec<String>>,
}

impl PageviewTracker for RecordingTracker {
    fn track_pageview(&self, url: &str) {
        self.pageviews.lock().unwrap().push(url.to_string());
    }
}

impl RecordingTracker {
    pub fn count(&self) -> usize {
        self.pageviews.lock().unwrap().len()
    }
}

/// One headless tab wired to a stub transport.
pub struct Tab {
    pub page: Arc<HtmlPage>,
    pub history: Arc<SessionHistory>,
    pub transport: Arc<StubTransport>,
    pub tracker: Arc<RecordingTracker>,
    pub events: Arc<EventBus>,
    pub env: Environment,
    pub navigator: Arc<dyn Navigator>,
}

impl Tab {
    pub fn new() -> Self {
        Self::with_history(SessionHistory::new(&format!("{ORIGIN}/")))
    }

    pub fn with_history(history: SessionHistory) -> Self {
        let page = Arc::new(HtmlPage::parse(&format!("{ORIGIN}/"), PAGE));
        let history = Arc::new(history);
        let transport = Arc::new(StubTransport::default());
        let tracker = Arc::new(RecordingTracker::default());
        let events = Arc::new(EventBus::new(64));
        let env = Environment::new(
            page.clone(),
            history.clone(),
            history.clone(),
            transport.clone(),
        )
        .with_events(events.clone())
        .with_tracker(tracker.clone());
        let navigator = select_navigator(PjaxConfig::default(), env.clone());
        Self {
            page,
            history,
            transport,
            tracker,
            events,
            env,
            navigator,
        }
    }

    pub fn main_html(&self) -> String {
        self.page.inner_html("#main").unwrap_or_default()
    }

    pub fn title(&self) -> String {
        self.page.title()
    }
}
