//! Message and result types for the generative adapter.

use serde::{Deserialize, Serialize};

/// Role of a message in a chat-completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message providing context and instructions.
    System,
    /// User message (the normalized question).
    User,
    /// Assistant message (model response).
    Assistant,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// The adapter's canonical output: a candidate statement plus metadata.
///
/// `confidence` is clamped to [0, 1] and `assumptions` is capped at six
/// entries; loosely-typed model output is coerced into this shape by the
/// payload parser, degrading to defaults rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlGeneration {
    /// The candidate SQL statement. Untrusted until guarded.
    pub sql: String,
    /// Model self-reported confidence in [0, 1].
    pub confidence: f64,
    /// Free-text notes from the model.
    pub notes: String,
    /// Up to six assumptions the model made.
    pub assumptions: Vec<String>,
}
