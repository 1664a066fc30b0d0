//! Error Types
//!
//! Errors reported by upstream backends and by the fallback router.

use std::time::Duration;
use thiserror::Error;

/// A failed call to one upstream chat-completion backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", upstream_message(.status, .message))]
pub struct UpstreamError {
    /// HTTP status code, if the backend answered at all
    pub status: Option<u16>,

    /// Human-readable reason (usually a body excerpt)
    pub message: String,

    /// Retry-After hint sent by the backend
    pub retry_after: Option<Duration>,
}

impl UpstreamError {
    /// Error for a backend that answered with a non-success status
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            retry_after: None,
        }
    }

    /// Error for a call that never produced a status (connect failure, decode failure)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Successful call whose response carried no text
    pub fn empty_response() -> Self {
        Self::transport("Empty response from model")
    }

    pub fn retry_after(mut self, hint: Duration) -> Self {
        self.retry_after = Some(hint);
        self
    }
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("upstream returned {}: {}", status, message),
        None => format!("upstream call failed: {}", message),
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("Request timeout: {}", err)
        } else if err.is_connect() {
            format!("Connection failed: {}", err)
        } else if err.is_decode() {
            format!("Failed to decode response: {}", err)
        } else {
            err.to_string()
        };

        Self {
            status: err.status().map(|s| s.as_u16()),
            message,
            retry_after: None,
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::transport(format!("JSON parsing error: {}", err))
    }
}

/// Main error type for router operations
#[derive(Debug, Error)]
pub enum FallbackError {
    /// Configuration errors (invalid JSON, empty backend list, missing key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied a request the router refuses to forward
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every backend was tried or cooling down in this call
    #[error("{}", exhausted_message(.last_error))]
    AllBackendsUnavailable { last_error: Option<UpstreamError> },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exhausted_message(last_error: &Option<UpstreamError>) -> String {
    match last_error {
        Some(err) => format!("All AI models are currently unavailable (last error: {})", err),
        None => "All AI models are currently unavailable".to_string(),
    }
}

impl FallbackError {
    /// Status code of the last upstream failure behind an exhaustion error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FallbackError::AllBackendsUnavailable {
                last_error: Some(err),
            } => err.status,
            _ => None,
        }
    }

    /// Whether calling again later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, FallbackError::AllBackendsUnavailable { .. })
    }
}

impl From<serde_json::Error> for FallbackError {
    fn from(err: serde_json::Error) -> Self {
        FallbackError::Config(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for FallbackError {
    fn from(err: std::io::Error) -> Self {
        FallbackError::Config(format!("IO error: {}", err))
    }
}

/// Result type alias for router operations
pub type Result<T> = std::result::Result<T, FallbackError>;
