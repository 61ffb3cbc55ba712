//! Link binding: turn clicks on links into navigation requests.

use std::sync::Arc;

use scraper::ElementRef;
use url::Url;

use crate::dom::ElementInfo;
use crate::error::PjaxResult;
use crate::navigator::Navigator;
use crate::options::{Container, NavigationOptions, TargetUrl};
use crate::transport::RequestHandle;

/// A clickable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub element: ElementInfo,
    /// Whitespace-normalized link text.
    pub text: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            element: ElementInfo::new("a"),
            text: String::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.element = self.element.with_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.element.attribute(name)
    }

    /// Build a link from a parsed `<a>` element, resolving `href` against `base`.
    pub fn from_element(el: &ElementRef<'_>, base: &str) -> Option<Self> {
        let raw = el.value().attr("href")?;
        let href = Url::parse(base)
            .and_then(|b| b.join(raw))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string());
        let element = ElementInfo {
            tag: el.value().name().to_string(),
            attributes: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let text = el
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self {
            href,
            element,
            text,
        })
    }
}

/// A mouse click as seen by the link handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    /// 1 = primary, 2 = middle, 3 = secondary.
    pub which: u8,
    pub meta_key: bool,
    pub ctrl_key: bool,
}

impl Default for ClickEvent {
    fn default() -> Self {
        Self::primary()
    }
}

impl ClickEvent {
    pub fn primary() -> Self {
        Self {
            which: 1,
            meta_key: false,
            ctrl_key: false,
        }
    }

    pub fn button(which: u8) -> Self {
        Self {
            which,
            ..Self::primary()
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    /// Non-primary buttons and new-tab modifiers keep the browser's behaviour.
    pub fn wants_default(&self) -> bool {
        self.which > 1 || self.meta_key || self.ctrl_key
    }
}

/// What a click did.
#[derive(Debug)]
pub enum ClickOutcome {
    /// The handler stepped aside; the browser follows the link normally.
    Default,
    /// Default action and propagation were suppressed and a navigation issued.
    Intercepted(Option<RequestHandle>),
}

impl ClickOutcome {
    pub fn default_prevented(&self) -> bool {
        matches!(self, ClickOutcome::Intercepted(_))
    }

    /// The in-flight request, if the click issued one.
    pub fn request(&self) -> Option<&RequestHandle> {
        match self {
            ClickOutcome::Intercepted(handle) => handle.as_ref(),
            ClickOutcome::Default => None,
        }
    }
}

struct ClickHandler {
    navigator: Arc<dyn Navigator>,
    options: NavigationOptions,
    container_attribute: String,
}

/// A link, possibly with click interception attached.
pub struct BoundLink {
    link: Link,
    handler: Option<ClickHandler>,
}

impl BoundLink {
    /// The link unmodified: clicks always fall through to the browser.
    pub fn passive(link: Link) -> Self {
        Self {
            link,
            handler: None,
        }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn is_intercepting(&self) -> bool {
        self.handler.is_some()
    }

    /// Dispatch a click.
    pub fn click(&self, event: &ClickEvent) -> PjaxResult<ClickOutcome> {
        let Some(handler) = &self.handler else {
            return Ok(ClickOutcome::Default);
        };
        if event.wants_default() {
            tracing::debug!(href = %self.link.href, "modified click, leaving it to the browser");
            return Ok(ClickOutcome::Default);
        }

        // Fresh options per click so one navigation never leaks into the next.
        let mut options = handler.options.clone();
        if options.container.is_none() {
            options.container = self
                .link
                .attribute(&handler.container_attribute)
                .map(Container::selector);
        }
        options.clicked = Some(self.link.clone());

        let handle = handler
            .navigator
            .request(TargetUrl::from(self.link.href.as_str()), options)?;
        Ok(ClickOutcome::Intercepted(handle))
    }
}

/// Attach interception to `link`. Fails if the container is not a selector string.
pub(crate) fn intercept(
    navigator: Arc<dyn Navigator>,
    link: Link,
    container: Option<Container>,
    options: Option<NavigationOptions>,
    container_attribute: String,
) -> PjaxResult<BoundLink> {
    let mut options = options.unwrap_or_default();
    if container.is_some() {
        options.container = container;
    }
    if options.container.is_some() {
        options.container_selector()?;
    }

    tracing::debug!(href = %link.href, "link bound");
    Ok(BoundLink {
        link,
        handler: Some(ClickHandler {
            navigator,
            options,
            container_attribute,
        }),
    })
}
