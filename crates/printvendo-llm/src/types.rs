//! Wire and result types for the completion client.

use serde::{Deserialize, Serialize};

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction.
    System,
    /// The kiosk user.
    User,
    /// The model.
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
}

/// Token counters for one or more service calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    /// Prompt-side tokens.
    pub input_tokens: u64,
    /// Completion-side tokens.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another call's usage into this one.
    pub fn absorb(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// The result of one service round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    /// The text of this chunk.
    pub text: String,
    /// Usage reported for this call.
    pub usage: TokenUsage,
}

/// A finished completion: all chunks concatenated, all usage summed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Full response text.
    pub text: String,
    /// Total input tokens across all calls.
    pub input_tokens: u64,
    /// Total output tokens across all calls.
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_absorb() {
        let mut total = TokenUsage::default();
        total.absorb(TokenUsage {
            input_tokens: 10,
            output_tokens: 20,
        });
        total.absorb(TokenUsage {
            input_tokens: 5,
            output_tokens: 7,
        });
        assert_eq!(total.input_tokens, 15);
        assert_eq!(total.output_tokens, 27);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&ChatMessage::user("hi")).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );
    }
}
