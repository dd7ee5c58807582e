//! Notification error types

use thiserror::Error;

/// Errors raised while sending a notification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Notification rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.to_string())
    }
}

/// Result type for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;
