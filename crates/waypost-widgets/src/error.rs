//! Error types for widget API calls

use thiserror::Error;

/// Result type for widget operations
pub type Result<T> = std::result::Result<T, WidgetError>;

/// Errors from widget fetch-then-render operations
#[derive(Error, Debug)]
pub enum WidgetError {
    /// API call completed with a non-success status
    #[error("API error: {status} - {message}")]
    Http {
        status: u16,
        message: String,
    },

    /// Network connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Response body was not the expected JSON shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The operation requires a signed-in user
    #[error("Sign-in required")]
    Unauthorized,
}

impl WidgetError {
    /// Whether the error means the user needs to sign in
    pub fn needs_sign_in(&self) -> bool {
        matches!(
            self,
            WidgetError::Unauthorized | WidgetError::Http { status: 401, .. }
        )
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            WidgetError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            WidgetError::Connection(e.to_string())
        }
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(e: serde_json::Error) -> Self {
        WidgetError::Decode(e.to_string())
    }
}
