//! pjax: pushState + ajax navigation.
//!
//! Intercepts link clicks, fetches the target as a fragment, swaps it into a
//! container, and keeps session history in step so deep links, titles, and
//! back/forward keep working. Failures of any kind degrade to a full page
//! load.
//!
//! The DOM, history, address bar, and HTTP transport are traits; the crate
//! ships headless implementations of each ([`HtmlPage`], [`SessionHistory`],
//! [`ReqwestTransport`]).

pub mod binder;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod fragment;
pub mod headless;
pub mod history;
pub mod listener;
pub mod navigator;
pub mod options;
pub mod page;
pub mod state;
pub mod transport;

pub use binder::{BoundLink, ClickEvent, ClickOutcome, Link};
pub use config::PjaxConfig;
pub use dom::{Dom, ElementInfo};
pub use error::{PjaxError, PjaxResult};
pub use events::{EventBus, FallbackReason, NavigationOutcome, PjaxEvent};
pub use headless::{HistoryEntry, HistoryWrite, PageLoad, SessionHistory};
pub use history::{History, Location, PageviewTracker, PopStateEvent};
pub use listener::{HistoryListener, PopOutcome};
pub use navigator::{select_navigator, Environment, FallbackNavigator, Navigator, PjaxNavigator};
pub use options::{Container, NavigationOptions, TargetUrl};
pub use page::HtmlPage;
pub use state::HistoryStateRecord;
pub use transport::{FetchRequest, FetchResponse, ReadyState, RequestHandle, ReqwestTransport, Transport};
