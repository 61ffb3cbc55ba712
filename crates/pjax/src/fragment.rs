//! Response-body classification and title extraction.
//!
//! A fragment response carries only the markup for one container. Anything
//! else (an empty body, a whole document) means the server does not speak
//! the fragment protocol for this URL and the caller must fall back to a
//! full navigation.

use regex::Regex;
use scraper::{Html, Selector};

use crate::events::FallbackReason;

/// What kind of body a navigation fetch returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fragment,
    Empty,
    FullDocument,
}

impl BodyKind {
    /// The fallback reason for a non-fragment body.
    pub fn fallback_reason(self) -> Option<FallbackReason> {
        match self {
            BodyKind::Fragment => None,
            BodyKind::Empty => Some(FallbackReason::EmptyBody),
            BodyKind::FullDocument => Some(FallbackReason::FullDocument),
        }
    }
}

/// Classify a response body.
pub fn classify(body: &str) -> BodyKind {
    if body.trim().is_empty() {
        return BodyKind::Empty;
    }
    let html_tag = Regex::new(r"(?i)<html").expect("html tag regex is valid");
    if html_tag.is_match(body) {
        return BodyKind::FullDocument;
    }
    BodyKind::Fragment
}

/// A fragment split into its title and the markup to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Trimmed text of the first `<title>`, if it had any.
    pub title: Option<String>,
    /// Markup with the `<title>` element removed.
    pub markup: String,
}

/// Pull the first `<title>` out of a fragment before it is inserted.
///
/// Without a title the body is passed through untouched. With one, the
/// fragment is re-serialized minus that element.
pub fn split_title(body: &str) -> Fragment {
    let mut fragment = Html::parse_fragment(body);
    let selector = Selector::parse("title").expect("title selector is valid");

    let found = fragment.select(&selector).next().map(|el| {
        let text = el.text().collect::<String>().trim().to_string();
        (el.id(), text)
    });

    let Some((node_id, text)) = found else {
        return Fragment {
            title: None,
            markup: body.to_string(),
        };
    };

    if let Some(mut node) = fragment.tree.get_mut(node_id) {
        node.detach();
    }

    Fragment {
        title: (!text.is_empty()).then_some(text),
        markup: fragment.root_element().inner_html(),
    }
}
