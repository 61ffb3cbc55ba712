//! In-memory session history and address bar.
//!
//! [`SessionHistory`] implements both [`History`] and [`Location`] so the
//! navigator can run without a browser. It keeps a log of every history
//! write and every full navigation the navigator requested; a driver (the
//! shell, or a test) drains the pending loads and performs them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use url::Url;

use crate::history::{History, Location, PopStateEvent};

/// One session history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub state: Value,
}

/// A recorded `push_state` / `replace_state` call.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryWrite {
    Push {
        state: Value,
        title: String,
        url: Option<String>,
    },
    Replace {
        state: Value,
        title: String,
        url: Option<String>,
    },
}

/// A full page load requested through [`Location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad {
    Assign(String),
    Reload(String),
}

impl PageLoad {
    pub fn url(&self) -> &str {
        match self {
            PageLoad::Assign(url) | PageLoad::Reload(url) => url,
        }
    }
}

struct SessionInner {
    entries: Vec<HistoryEntry>,
    index: usize,
    writes: Vec<HistoryWrite>,
    pending_loads: Vec<PageLoad>,
    hash_writes: Vec<String>,
}

/// Session history for one headless tab.
pub struct SessionHistory {
    inner: Mutex<SessionInner>,
    push_state_supported: bool,
    state_property: bool,
}

impl SessionHistory {
    /// A fresh session whose only entry is `url` with no state.
    pub fn new(url: &str) -> Self {
        Self::with_entry(HistoryEntry {
            url: url.to_string(),
            title: String::new(),
            state: Value::Null,
        })
    }

    /// A session whose current entry already carries `state`.
    pub fn with_state(url: &str, state: Value) -> Self {
        Self::with_entry(HistoryEntry {
            url: url.to_string(),
            title: String::new(),
            state,
        })
    }

    fn with_entry(entry: HistoryEntry) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                entries: vec![entry],
                index: 0,
                writes: Vec::new(),
                pending_loads: Vec::new(),
                hash_writes: Vec::new(),
            }),
            push_state_supported: true,
            state_property: true,
        }
    }

    /// Simulate an environment without push-state.
    pub fn without_push_state(mut self) -> Self {
        self.push_state_supported = false;
        self
    }

    /// Simulate an older browser whose history has no `state` property and
    /// which fires a popstate on page load.
    pub fn without_state_property(mut self) -> Self {
        self.state_property = false;
        self
    }

    /// Move one entry back and return the event to dispatch, if possible.
    pub fn back(&self) -> Option<PopStateEvent> {
        self.go(-1)
    }

    /// Move one entry forward and return the event to dispatch, if possible.
    pub fn forward(&self) -> Option<PopStateEvent> {
        self.go(1)
    }

    /// Move `delta` entries and return the event to dispatch.
    pub fn go(&self, delta: isize) -> Option<PopStateEvent> {
        let mut inner = self.lock();
        let target = inner.index.checked_add_signed(delta)?;
        if target >= inner.entries.len() || target == inner.index {
            return None;
        }
        inner.index = target;
        let entry = &inner.entries[target];
        tracing::debug!(url = %entry.url, "history traversal");
        Some(PopStateEvent::new(entry.state.clone()))
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.clone()
    }

    /// Position of the current entry.
    pub fn index(&self) -> usize {
        self.lock().index
    }

    /// The current entry.
    pub fn current(&self) -> HistoryEntry {
        let inner = self.lock();
        inner.entries[inner.index].clone()
    }

    /// Every history write so far, in order.
    pub fn writes(&self) -> Vec<HistoryWrite> {
        self.lock().writes.clone()
    }

    /// Every value passed to `set_hash`, in order.
    pub fn hash_writes(&self) -> Vec<String> {
        self.lock().hash_writes.clone()
    }

    /// Full loads requested so far, without draining them.
    pub fn pending_loads(&self) -> Vec<PageLoad> {
        self.lock().pending_loads.clone()
    }

    /// Drain the full loads the driver still has to perform.
    pub fn take_pending_loads(&self) -> Vec<PageLoad> {
        std::mem::take(&mut self.lock().pending_loads)
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionInner {
    fn current_url(&self) -> &str {
        &self.entries[self.index].url
    }

    fn resolve(&self, url: &str) -> String {
        Url::parse(self.current_url())
            .and_then(|base| base.join(url))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }
}

impl History for SessionHistory {
    fn supports_push_state(&self) -> bool {
        self.push_state_supported
    }

    fn exposes_state(&self) -> bool {
        self.state_property
    }

    fn push_state(&self, state: Value, title: &str, url: Option<&str>) {
        let mut inner = self.lock();
        let next_url = match url {
            Some(u) => inner.resolve(u),
            None => inner.current_url().to_string(),
        };
        inner.writes.push(HistoryWrite::Push {
            state: state.clone(),
            title: title.to_string(),
            url: url.map(str::to_string),
        });
        inner.push(HistoryEntry {
            url: next_url,
            title: title.to_string(),
            state,
        });
    }

    fn replace_state(&self, state: Value, title: &str, url: Option<&str>) {
        let mut inner = self.lock();
        let next_url = match url {
            Some(u) => inner.resolve(u),
            None => inner.current_url().to_string(),
        };
        inner.writes.push(HistoryWrite::Replace {
            state: state.clone(),
            title: title.to_string(),
            url: url.map(str::to_string),
        });
        let index = inner.index;
        inner.entries[index] = HistoryEntry {
            url: next_url,
            title: title.to_string(),
            state,
        };
    }
}

impl Location for SessionHistory {
    fn href(&self) -> String {
        self.lock().current_url().to_string()
    }

    fn hash(&self) -> String {
        let inner = self.lock();
        match Url::parse(inner.current_url()) {
            Ok(url) => url
                .fragment()
                .filter(|f| !f.is_empty())
                .map(|f| format!("#{f}"))
                .unwrap_or_default(),
            Err(_) => inner
                .current_url()
                .find('#')
                .map(|i| inner.current_url()[i..].to_string())
                .filter(|h| h.len() > 1)
                .unwrap_or_default(),
        }
    }

    fn set_hash(&self, hash: &str) {
        let mut inner = self.lock();
        let fragment = hash.strip_prefix('#').unwrap_or(hash);
        let updated = match Url::parse(inner.current_url()) {
            Ok(mut url) => {
                url.set_fragment(Some(fragment));
                url.to_string()
            }
            Err(_) => {
                let base = inner.current_url().split('#').next().unwrap_or_default();
                format!("{base}#{fragment}")
            }
        };
        inner.hash_writes.push(hash.to_string());
        let index = inner.index;
        inner.entries[index].url = updated;
    }

    fn assign(&self, url: &str) {
        let mut inner = self.lock();
        let target = inner.resolve(url);
        tracing::debug!(url = %target, "full navigation requested");
        inner.pending_loads.push(PageLoad::Assign(target.clone()));
        inner.push(HistoryEntry {
            url: target,
            title: String::new(),
            state: Value::Null,
        });
    }

    fn reload(&self) {
        let mut inner = self.lock();
        let current = inner.current_url().to_string();
        tracing::debug!(url = %current, "reload requested");
        inner.pending_loads.push(PageLoad::Reload(current));
    }
}
