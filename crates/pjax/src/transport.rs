//! HTTP transport capability and in-flight request handles.
//!
//! [`Transport`] is the seam the navigator fetches through; [`ReqwestTransport`]
//! is the real implementation. Every issued fetch is tracked by a
//! [`RequestHandle`] exposing its ready state and an abort operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::config::encode_query;
use crate::error::{PjaxError, PjaxResult};
use crate::state::url_with_query;

/// A navigation fetch, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Query parameters in send order.
    pub parameters: Vec<(String, String)>,
}

impl FetchRequest {
    /// A plain GET with no extra headers or parameters.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Form-encoded query string of `parameters`.
    pub fn query_string(&self) -> String {
        encode_query(&self.parameters)
    }

    /// The URL with `parameters` appended.
    pub fn full_url(&self) -> String {
        if self.parameters.is_empty() {
            return self.url.clone();
        }
        url_with_query(&self.url, &self.query_string())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response to a navigation fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues navigation fetches. Timeout policy belongs to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `request`. Network errors, timeouts, and non-2xx statuses are errors.
    async fn fetch(&self, request: FetchRequest) -> PjaxResult<FetchResponse>;
}

/// [`Transport`] over `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given timeout.
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("pjax/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: FetchRequest) -> PjaxResult<FetchResponse> {
        tracing::debug!(method = %request.method, url = %request.full_url(), "fetching");
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.parameters);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let r = builder.send().await?;
        let status = r.status().as_u16();
        let final_url = r.url().to_string();

        if !r.status().is_success() {
            return Err(PjaxError::Status {
                status,
                url: final_url,
            });
        }

        let headers: Vec<(String, String)> = r
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = r.text().await?;

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

/// Lifecycle of a navigation fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// Created, not yet handed to the transport.
    Unsent,
    /// Waiting on the transport.
    Loading,
    /// Finished, failed, or aborted.
    Done,
}

struct HandleInner {
    id: u64,
    request: FetchRequest,
    state: watch::Sender<ReadyState>,
    detached: AtomicBool,
    task: Mutex<Option<AbortHandle>>,
}

/// Handle to one issued navigation fetch.
#[derive(Clone)]
pub struct RequestHandle {
    inner: Arc<HandleInner>,
}

impl RequestHandle {
    pub(crate) fn new(id: u64, request: FetchRequest) -> Self {
        let (state, _) = watch::channel(ReadyState::Unsent);
        Self {
            inner: Arc::new(HandleInner {
                id,
                request,
                state,
                detached: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    /// Sequence number of this request within its navigator.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The request as handed to the transport.
    pub fn request(&self) -> &FetchRequest {
        &self.inner.request
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.borrow()
    }

    /// True once the response handler has been detached.
    pub fn is_aborted(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }

    /// Detach the response handler, then cancel the transport task.
    pub fn abort(&self) {
        self.inner.detached.store(true, Ordering::SeqCst);
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.inner.state.send_replace(ReadyState::Done);
    }

    /// Wait until the request is done (completed or aborted).
    pub async fn finished(&self) {
        let mut rx = self.inner.state.subscribe();
        let _ = rx.wait_for(|state| *state == ReadyState::Done).await;
    }

    pub(crate) fn attach_task(&self, task: AbortHandle) {
        let mut slot = self.inner.task.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_aborted() {
            task.abort();
        } else {
            *slot = Some(task);
        }
    }

    pub(crate) fn mark_loading(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state == ReadyState::Unsent {
                *state = ReadyState::Loading;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn mark_done(&self) {
        self.inner.state.send_replace(ReadyState::Done);
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.inner.id)
            .field("url", &self.inner.request.url)
            .field("ready_state", &self.ready_state())
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
