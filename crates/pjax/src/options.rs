//! Per-navigation options and the user-supplied callback stages.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;

use crate::binder::Link;
use crate::dom::ElementInfo;
use crate::error::{PjaxError, PjaxResult};
use crate::events::NavigationOutcome;
use crate::transport::FetchResponse;

/// Runs after the internal success stage has swapped content and written history.
pub type SuccessCallback = Arc<dyn Fn(&FetchResponse) + Send + Sync>;
/// Runs after a transport failure has already triggered the full navigation.
pub type FailureCallback = Arc<dyn Fn(&PjaxError) + Send + Sync>;
/// Runs once per non-cancelled navigation, whatever its outcome.
pub type CompleteCallback = Arc<dyn Fn(NavigationOutcome) + Send + Sync>;

/// The URL to navigate to, either known up front or produced on demand.
#[derive(Clone)]
pub enum TargetUrl {
    Static(String),
    Lazy(Arc<dyn Fn() -> String + Send + Sync>),
}

impl TargetUrl {
    /// Defer URL resolution until the request is issued.
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        TargetUrl::Lazy(Arc::new(producer))
    }

    /// Produce the concrete URL.
    pub fn resolve(&self) -> String {
        match self {
            TargetUrl::Static(url) => url.clone(),
            TargetUrl::Lazy(producer) => producer(),
        }
    }
}

impl fmt::Debug for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetUrl::Static(url) => f.debug_tuple("Static").field(url).finish(),
            TargetUrl::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

impl From<&str> for TargetUrl {
    fn from(url: &str) -> Self {
        TargetUrl::Static(url.to_string())
    }
}

impl From<String> for TargetUrl {
    fn from(url: String) -> Self {
        TargetUrl::Static(url)
    }
}

/// Where fetched content goes.
///
/// Only [`Container::Selector`] is usable: the value is written into history
/// entries and has to survive serialization. A live element reference is
/// accepted by the type so that the mistake surfaces as a configuration error
/// at setup time rather than at replay time.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    Selector(String),
    Element(ElementInfo),
}

impl Container {
    pub fn selector(selector: impl Into<String>) -> Self {
        Container::Selector(selector.into())
    }

    /// The selector string, or a configuration error for anything else.
    pub fn as_selector(&self) -> PjaxResult<&str> {
        match self {
            Container::Selector(s) => Ok(s),
            Container::Element(el) => Err(PjaxError::ContainerNotSelector(format!(
                "live <{}> element",
                el.tag
            ))),
        }
    }
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Container::Selector(selector.to_string())
    }
}

impl From<String> for Container {
    fn from(selector: String) -> Self {
        Container::Selector(selector)
    }
}

/// Configuration for a single navigation attempt.
#[derive(Clone)]
pub struct NavigationOptions {
    pub container: Option<Container>,
    /// Append a history entry on success.
    pub push: bool,
    /// Overwrite the current history entry instead. Wins over `push`.
    pub replace: bool,
    pub method: Method,
    /// Extra query parameters, in send order. The marker parameter is appended.
    pub extra_parameters: Vec<(String, String)>,
    /// Extra request headers, sent after the navigation header.
    pub headers: Vec<(String, String)>,
    /// The link whose click started this navigation, if any.
    pub clicked: Option<Link>,
    pub on_success: Option<SuccessCallback>,
    pub on_failure: Option<FailureCallback>,
    pub on_complete: Option<CompleteCallback>,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            container: None,
            push: true,
            replace: false,
            method: Method::GET,
            extra_parameters: Vec::new(),
            headers: Vec::new(),
            clicked: None,
            on_success: None,
            on_failure: None,
            on_complete: None,
        }
    }
}

impl NavigationOptions {
    /// Options targeting `container` with every other field at its default.
    pub fn new(container: impl Into<Container>) -> Self {
        Self {
            container: Some(container.into()),
            ..Self::default()
        }
    }

    pub fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_parameters.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&FetchResponse) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&PjaxError) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(f));
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(NavigationOutcome) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// The container selector, validated.
    pub fn container_selector(&self) -> PjaxResult<&str> {
        self.container
            .as_ref()
            .ok_or(PjaxError::ContainerMissing)?
            .as_selector()
    }
}

impl fmt::Debug for NavigationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationOptions")
            .field("container", &self.container)
            .field("push", &self.push)
            .field("replace", &self.replace)
            .field("method", &self.method)
            .field("extra_parameters", &self.extra_parameters)
            .field("headers", &self.headers)
            .field("clicked", &self.clicked)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}
