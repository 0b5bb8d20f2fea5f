//! Remote store error handling

use thiserror::Error;

/// Errors from the remote post table
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Request could not be sent or the connection dropped
    #[error("Remote request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("Remote service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Could not decode remote response: {0}")]
    Decode(String),

    /// A write violated the unique slug constraint
    #[error("Slug '{slug}' is already taken")]
    Conflict { slug: String },

    /// Every slug candidate was taken by a concurrent writer
    #[error("Could not allocate a unique slug for '{base}' after {attempts} attempts")]
    SlugExhausted { base: String, attempts: usize },

    /// Caller-supplied payload has the wrong shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// No remote URL or key configured
    #[error("Remote backend is not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Decode(e.to_string())
    }
}

impl RemoteError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Transport(_) => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;
