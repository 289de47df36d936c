//! Error types for backend calls.

use medibook_core::MedibookError;

/// Longest slice of an error body carried into a message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors from the booking backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to connect to API at {url}. Is the API server running?")]
    Connection { url: String },
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API request timed out after {0}s")]
    Timeout(u64),
    #[error("unexpected response from API: {0}")]
    Decode(String),
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl BackendError {
    /// Build a status error, truncating the body to keep replies readable.
    pub fn status(status: u16, body: &str) -> Self {
        BackendError::Status {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }
}

impl From<BackendError> for MedibookError {
    fn from(err: BackendError) -> Self {
        MedibookError::Backend(err.to_string())
    }
}
