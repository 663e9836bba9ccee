//! Configuration file support

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use nib_ai::request::{GenerationOptions, TopicOverride};
use serde::{Deserialize, Serialize};

/// Which transport dispatches requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// External HTTP client subprocess
    #[default]
    Curl,
    /// Hand-rolled HTTP/1.1 over TCP/TLS
    Socket,
}

/// Configuration for nib
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model to use
    pub model: String,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// System prompt, passed through verbatim
    pub system_prompt: String,
    /// Completion endpoint URL
    pub endpoint: String,
    /// Transport selection
    pub transport: TransportKind,
    /// Client binary for the subprocess transport
    pub http_client: String,
    /// Conversation log cap (oldest turns evicted first)
    pub max_history: usize,
    /// History file path; None disables persistence
    pub history_file: Option<PathBuf>,
    /// API key (environment variable is the recommended source)
    pub api_key: Option<String>,
    /// Per-topic overrides keyed by language/topic identifier
    pub topics: HashMap<String, TopicOverride>,
}

impl Default for Config {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            model: options.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system_prompt: String::new(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            transport: TransportKind::Curl,
            http_client: "curl".to_string(),
            max_history: 50,
            history_file: Some(Self::data_dir().join("history.json")),
            api_key: None,
            topics: HashMap::new(),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nib")
    }

    /// Get the data directory (history file lives here)
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nib")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for NIB_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("NIB_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location. A missing, unreadable, or
    /// unparsable file degrades to defaults with a warning.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific file, with the same degradation
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse config file: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read config file: {e}");
                Self::default()
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific file, creating parent directories
    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Resolve the API credential: config first, then the environment.
    /// Read once at startup; absence is a configuration error surfaced
    /// before any network activity.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.trim().is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// Base generation options from this config
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system_prompt: self.system_prompt.clone(),
        }
    }
}
