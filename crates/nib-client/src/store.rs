//! Durable storage for the conversation log
//!
//! The store is injected, not owned: the log calls it on every
//! successful append and once at startup. The persisted format is a
//! single JSON array of `{role, content}` objects, most-recent last.

use std::fs;
use std::path::{Path, PathBuf};

use nib_ai::Turn;

use crate::error::{Error, Result};

/// Filesystem sink for history persistence
pub trait HistoryStore: Send + Sync {
    /// Rewrite the store with the full current history.
    fn save(&self, turns: &[Turn]) -> Result<()>;

    /// Read the persisted history. A missing store yields an empty
    /// vector; a corrupt one is an error the caller degrades on.
    fn load(&self) -> Result<Vec<Turn>>;
}

/// Store backed by a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonFileStore {
    fn save(&self, turns: &[Turn]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::Store(e.to_string()))?;
        }
        let json = serde_json::to_string(turns).map_err(|e| Error::Store(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| Error::Store(e.to_string()))
    }

    fn load(&self) -> Result<Vec<Turn>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| Error::Store(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| Error::Store(e.to_string()))
    }
}

/// Store that keeps nothing, for hosts with persistence disabled
#[derive(Debug, Default)]
pub struct NullStore;

impl HistoryStore for NullStore {
    fn save(&self, _turns: &[Turn]) -> Result<()> {
        Ok(())
    }

    fn load(&self) -> Result<Vec<Turn>> {
        Ok(Vec::new())
    }
}
