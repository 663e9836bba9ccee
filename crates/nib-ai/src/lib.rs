//! nib-ai: Completion wire layer
//!
//! This crate turns prompt text into a request against the Anthropic
//! messages API and turns the raw response bytes back into assistant text:
//! request construction, transport dispatch (subprocess HTTP client or a
//! hand-rolled TCP/TLS client), response aggregation, envelope parsing,
//! and code-block extraction.

pub mod envelope;
pub mod error;
pub mod extract;
pub mod request;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use transport::{ChunkStream, Transport};
pub use types::*;
