//! Error types for the navigation core.

/// All errors that can occur while setting up or running a navigation.
///
/// Only configuration problems reach callers of [`crate::Navigator`]; transport
/// and fragment failures are recovered internally by a full navigation.
#[derive(thiserror::Error, Debug)]
pub enum PjaxError {
    #[error("pjax container must be a string selector, got {0}")]
    ContainerNotSelector(String),

    #[error("pjax container is missing")]
    ContainerMissing,

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("no async runtime available to issue the request")]
    NoRuntime,
}

/// Convenience result type.
pub type PjaxResult<T> = Result<T, PjaxError>;
