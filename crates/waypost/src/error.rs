//! Error types for navigation and prefetch operations

use thiserror::Error;

/// Result type for router operations
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors that can occur while loading or patching pages
#[derive(Error, Debug)]
pub enum RouterError {
    /// HTTP request completed with a non-success status
    #[error("HTTP error: {status} - {message}")]
    Http {
        status: u16,
        message: String,
    },

    /// Network connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Request timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Invalid URL or origin
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Page not found
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Page payload could not be parsed
    #[error("Malformed page payload: {0}")]
    Document(String),

    /// A required patch target is missing from the payload
    #[error("Payload has no {0} region")]
    MissingRegion(&'static str),
}

impl RouterError {
    /// Whether a foreground load hitting this error should fall back to a
    /// hard navigation (everything except programming errors does)
    pub fn triggers_hard_fallback(&self) -> bool {
        !matches!(self, RouterError::InvalidUrl(_))
    }
}

impl From<reqwest::Error> for RouterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RouterError::Timeout(30000)
        } else if e.is_connect() {
            RouterError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            RouterError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            RouterError::Connection(e.to_string())
        }
    }
}

impl From<url::ParseError> for RouterError {
    fn from(e: url::ParseError) -> Self {
        RouterError::InvalidUrl(e.to_string())
    }
}
