//! Error types for nib-client

use thiserror::Error;

/// Result type alias using nib-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the runtime layer
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Ai(#[from] nib_ai::Error),

    /// History store read/write failure (best-effort paths report these
    /// instead of returning them)
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether this failure happened before any network activity.
    pub fn is_config(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_config(),
            _ => false,
        }
    }
}
