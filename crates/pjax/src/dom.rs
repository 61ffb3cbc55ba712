//! DOM capability used by the navigator.
//!
//! The navigator never walks a document itself; it resolves selectors and
//! swaps content through this trait. [`crate::page::HtmlPage`] is the
//! headless implementation.

use crate::error::PjaxResult;

/// The document operations a navigation needs.
pub trait Dom: Send + Sync {
    /// Whether `selector` matches a live element.
    fn contains(&self, selector: &str) -> bool;
    /// Replace the content of the first element matching `selector`.
    fn replace_content(&self, selector: &str, markup: &str) -> PjaxResult<()>;
    /// Current document title.
    fn title(&self) -> String;
    /// Set the document title.
    fn set_title(&self, title: &str);
}

/// A detached description of an element: tag name plus attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
