//! Error types for nib-ai

use thiserror::Error;

/// Result type alias using nib-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur along the completion pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is incomplete (empty prompt, missing credential)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The transport failed to deliver the request or response
    #[error("Transport error: {0}")]
    Transport(String),

    /// No terminal signal from the transport within the configured window
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The raw bytes were not a recognizable HTTP response
    #[error("Malformed response envelope: {0}")]
    MalformedEnvelope(String),

    /// The response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON decoded but didn't match the expected envelope shape
    #[error("Unexpected response schema: {0}")]
    UnexpectedSchema(String),

    /// The provider reported an error (carried verbatim for display)
    #[error("Provider error ({status}): {message}")]
    Provider { status: String, message: String },
}

impl Error {
    /// Create a transport error from anything displayable
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create a provider error from status and message
    pub fn provider(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            status: status.into(),
            message: message.into(),
        }
    }

    /// Whether the server was reached but replied incomprehensibly,
    /// as opposed to the network being unreachable.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Error::MalformedEnvelope(_) | Error::Json(_) | Error::UnexpectedSchema(_)
        )
    }

    /// Whether this failure happened before any network activity.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
