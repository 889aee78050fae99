//! Error types for the research engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, running or exporting research queries.
///
/// Every variant is recoverable: callers surface it next to the form or as a dismissible
/// banner and leave the rest of the session untouched.
#[derive(Error, Debug)]
pub enum Error {
    /// Client-side validation failed; no request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request never reached the backend, or timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// A collaborator reported it cannot currently serve the request.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// True for failures raised before any request was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for failures of a live request (network or backend).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Backend { .. })
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
