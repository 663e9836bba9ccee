//! Core types for the completion pipeline

use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire-format role string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in the conversation log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Milliseconds since the epoch; not persisted
    #[serde(default, skip_serializing)]
    pub timestamp: i64,
}

impl Turn {
    /// Create a user turn stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant turn stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A fenced code region extracted from assistant text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag from the opening fence, if any
    pub language: Option<String>,
    pub code: String,
}

/// The result of a completed exchange. Derived, not persisted — the raw
/// assistant text is what the conversation log stores; code blocks are
/// recomputed on demand.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
}

impl Completion {
    /// Build a completion from assistant text, extracting fenced regions
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let code_blocks = crate::extract::code_blocks(&text);
        Self { text, code_blocks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serializes_without_timestamp() {
        let turn = Turn::user("explain x");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "explain x");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_turn_deserializes_persisted_shape() {
        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "hi");
        assert_eq!(turn.timestamp, 0);
    }

    #[test]
    fn test_completion_extracts_blocks() {
        let c = Completion::from_text("see:\n```go\nfmt.Println(x)\n```\n");
        assert_eq!(c.code_blocks.len(), 1);
        assert_eq!(c.code_blocks[0].language.as_deref(), Some("go"));
    }
}
