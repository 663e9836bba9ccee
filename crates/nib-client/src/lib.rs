//! nib-client: Editor-facing completion runtime
//!
//! Sits between an editor's UI layer and the nib-ai wire layer: owns the
//! bounded conversation log and its persistence, resolves configuration,
//! and exposes the submit/history surface the editor glue consumes.

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod notify;
pub mod store;

pub use client::{Client, ClientOptions};
pub use config::Config;
pub use error::{Error, Result};
pub use history::ConversationLog;
pub use notify::{LogNotifier, Notifier, Severity};
pub use store::{HistoryStore, JsonFileStore, NullStore};
