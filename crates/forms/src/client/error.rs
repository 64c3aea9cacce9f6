//! Backend API errors.

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing or rejected bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Failed to build a request or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local data was rejected before any request was sent.
    #[error("Request not sent: {0}")]
    NotSent(String),
}

impl ApiError {
    /// Text suitable for an error toast. Server-supplied messages are
    /// passed through; transport details are not.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            Self::Http(_) => "Could not reach the server".to_string(),
            Self::Api { message, .. } | Self::Unauthorized(message) | Self::NotFound(message) => {
                message.clone()
            }
            Self::Parse(_) => "The server sent an unexpected response".to_string(),
            Self::NotSent(message) => message.clone(),
        }
    }

    /// HTTP status, when the backend answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Http(_) | Self::Parse(_) | Self::NotSent(_) => None,
        }
    }
}
