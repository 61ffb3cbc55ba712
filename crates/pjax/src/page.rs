//! Headless page model backed by `scraper`.
//!
//! The page keeps its serialized markup and re-parses on demand, which keeps
//! it `Send + Sync` and lets any number of navigation tasks share it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ego_tree::NodeId;
use scraper::node::Text;
use scraper::{Html, Node, Selector};

use crate::binder::Link;
use crate::dom::Dom;
use crate::error::{PjaxError, PjaxResult};

struct PageInner {
    url: String,
    markup: String,
}

/// An HTML document that implements [`Dom`].
pub struct HtmlPage {
    inner: Mutex<PageInner>,
}

impl HtmlPage {
    /// Parse a full document loaded from `url`.
    pub fn parse(url: &str, html: &str) -> Self {
        let page = Self {
            inner: Mutex::new(PageInner {
                url: String::new(),
                markup: String::new(),
            }),
        };
        page.load(url, html);
        page
    }

    /// Replace the whole document, as a full page load does.
    pub fn load(&self, url: &str, html: &str) {
        let document = Html::parse_document(html);
        let mut inner = self.lock();
        inner.url = url.to_string();
        inner.markup = document.html();
        tracing::debug!(url, "page loaded");
    }

    /// URL the current document was loaded from.
    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Inner markup of the first element matching `selector`.
    pub fn inner_html(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        let document = Html::parse_document(&self.lock().markup);
        let html = document.select(&selector).next().map(|el| el.inner_html());
        html
    }

    /// Whitespace-normalized text of the first element matching `selector`.
    pub fn text(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        let document = Html::parse_document(&self.lock().markup);
        let text = document.select(&selector).next().map(|el| {
            el.text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        });
        text
    }

    /// Every `<a href>` in document order, hrefs resolved against the page URL.
    pub fn links(&self) -> Vec<Link> {
        let selector = Selector::parse("a[href]").expect("link selector is valid");
        let inner = self.lock();
        let document = Html::parse_document(&inner.markup);
        let links = document
            .select(&selector)
            .filter_map(|el| Link::from_element(&el, &inner.url))
            .collect();
        links
    }

    fn lock(&self) -> MutexGuard<'_, PageInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Dom for HtmlPage {
    fn contains(&self, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        let document = Html::parse_document(&self.lock().markup);
        let found = document.select(&selector).next().is_some();
        found
    }

    fn replace_content(&self, selector: &str, markup: &str) -> PjaxResult<()> {
        let parsed = Selector::parse(selector)
            .map_err(|e| PjaxError::InvalidSelector(format!("{selector}: {e:?}")))?;

        let mut inner = self.lock();
        let mut document = Html::parse_document(&inner.markup);
        let target = document
            .select(&parsed)
            .next()
            .map(|el| el.id())
            .ok_or_else(|| PjaxError::ContainerNotFound(selector.to_string()))?;

        let children: Vec<_> = document
            .tree
            .get(target)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default();
        for child in children {
            if let Some(mut node) = document.tree.get_mut(child) {
                node.detach();
            }
        }

        graft(&mut document, &Html::parse_fragment(markup), target);
        inner.markup = document.html();
        Ok(())
    }

    fn title(&self) -> String {
        document_title(&Html::parse_document(&self.lock().markup))
    }

    /// Rewrites the `<title>` element, adding one to `<head>` if missing.
    fn set_title(&self, title: &str) {
        let title_selector = Selector::parse("title").expect("title selector is valid");
        let head_selector = Selector::parse("head").expect("head selector is valid");

        let mut inner = self.lock();
        let mut document = Html::parse_document(&inner.markup);
        let existing = document.select(&title_selector).next().map(|el| el.id());
        let element = match existing {
            Some(id) => id,
            None => {
                let Some(head) = document.select(&head_selector).next().map(|el| el.id()) else {
                    return;
                };
                graft(&mut document, &Html::parse_fragment("<title></title>"), head);
                match document.select(&title_selector).next() {
                    Some(el) => el.id(),
                    None => return,
                }
            }
        };

        let children: Vec<_> = document
            .tree
            .get(element)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default();
        for child in children {
            if let Some(mut node) = document.tree.get_mut(child) {
                node.detach();
            }
        }
        if let Some(mut node) = document.tree.get_mut(element) {
            node.append(Node::Text(Text { text: title.into() }));
        }
        inner.markup = document.html();
    }
}

/// Copy the children of `fragment`'s root under `target`, parents first.
fn graft(document: &mut Html, fragment: &Html, target: NodeId) {
    let mut pending = vec![(fragment.root_element().id(), target)];
    while let Some((source, destination)) = pending.pop() {
        let Some(source) = fragment.tree.get(source) else {
            continue;
        };
        for child in source.children() {
            if let Some(mut parent) = document.tree.get_mut(destination) {
                let copied = parent.append(child.value().clone()).id();
                pending.push((child.id(), copied));
            }
        }
    }
}

fn document_title(document: &Html) -> String {
    let selector = Selector::parse("title").expect("title selector is valid");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
