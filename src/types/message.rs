use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User role.
    User,

    /// Assistant role.
    Assistant,

    /// System instructions.
    System,
}

/// What an assistant message ended up holding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Regular answer text.
    Normal,

    /// Only chain-of-thought text was received before the turn ended.
    Thinking,
}

/// A finalized message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The author of the message.
    pub role: Role,

    /// The answer text.
    pub content: String,

    /// Set for assistant messages; `None` for user and system messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,

    /// Thinking content received alongside the answer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,

    /// Zero-based position in the conversation history.
    pub ordinal: u64,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>, ordinal: u64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            kind: None,
            thinking: None,
            ordinal,
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>, ordinal: u64) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            kind: None,
            thinking: None,
            ordinal,
        }
    }

    /// Creates an assistant message from accumulated answer and thinking text.
    pub fn assistant(content: String, thinking: String, ordinal: u64) -> Self {
        let kind = if content.is_empty() && !thinking.is_empty() {
            MessageKind::Thinking
        } else {
            MessageKind::Normal
        };
        Self {
            role: Role::Assistant,
            content,
            kind: Some(kind),
            thinking: if thinking.is_empty() {
                None
            } else {
                Some(thinking)
            },
            ordinal,
        }
    }
}
