//! Drive pjax navigation against a live site from a terminal.

pub mod config;
pub mod repl;
pub mod session;

pub use config::{load_config, resolve_config_path};
pub use session::BrowserSession;
