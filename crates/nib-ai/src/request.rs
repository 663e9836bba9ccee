//! Request construction for the messages API

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    types::Turn,
};

/// Generation parameters for a completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g. "claude-sonnet-4-5-20250929")
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    pub temperature: f32,
    /// System prompt, passed through verbatim; empty means none
    #[serde(default)]
    pub system_prompt: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            system_prompt: String::new(),
        }
    }
}

/// Per-topic overrides keyed by a language/topic identifier.
/// Unset fields fall through to the base options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicOverride {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl GenerationOptions {
    /// Resolve a topic override onto the base options
    pub fn with_override(&self, ovr: &TopicOverride) -> Self {
        Self {
            model: ovr.model.clone().unwrap_or_else(|| self.model.clone()),
            max_tokens: ovr.max_tokens.unwrap_or(self.max_tokens),
            temperature: ovr.temperature.unwrap_or(self.temperature),
            system_prompt: ovr
                .system_prompt
                .clone()
                .unwrap_or_else(|| self.system_prompt.clone()),
        }
    }

    /// Look up `topic` in `overrides` and resolve, or return the base
    /// options unchanged when the topic is unknown or absent.
    pub fn for_topic(
        &self,
        topic: Option<&str>,
        overrides: &HashMap<String, TopicOverride>,
    ) -> Self {
        match topic.and_then(|t| overrides.get(t)) {
            Some(ovr) => self.with_override(ovr),
            None => self.clone(),
        }
    }
}

/// The provider-specific JSON payload. Built fresh per call; never
/// mutated after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<WireMessage>,
}

/// One entry of the outbound message list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Build the request payload from prior turns and the current prompt.
///
/// The prompt is always the final user message, so the message list is
/// never empty. Fails with `Error::Config` on an empty prompt — checked
/// here, before any transport work.
pub fn build_request(
    prompt: &str,
    history: &[Turn],
    options: &GenerationOptions,
) -> Result<CompletionRequest> {
    if prompt.trim().is_empty() {
        return Err(Error::Config("prompt is empty".to_string()));
    }

    let mut messages: Vec<WireMessage> = history
        .iter()
        .map(|turn| WireMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        })
        .collect();
    messages.push(WireMessage {
        role: "user".to_string(),
        content: prompt.to_string(),
    });

    Ok(CompletionRequest {
        model: options.model.clone(),
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        system: if options.system_prompt.is_empty() {
            None
        } else {
            Some(options.system_prompt.clone())
        },
        messages,
    })
}

/// Request headers for the messages API.
///
/// Fails with `Error::Config` when the credential is empty, so the
/// failure surfaces before a transport is ever invoked.
pub fn build_headers(api_key: &str) -> Result<Vec<(String, String)>> {
    if api_key.trim().is_empty() {
        return Err(Error::Config("API key is empty".to_string()));
    }
    Ok(vec![
        ("content-type".to_string(), "application/json".to_string()),
        ("anthropic-version".to_string(), "2023-06-01".to_string()),
        ("x-api-key".to_string(), api_key.to_string()),
    ])
}
