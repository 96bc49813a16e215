//! Chat messages: the ordered conversation history passed to `Router::chat`.

use serde::{Deserialize, Serialize};

/// The role of a message's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System-level instruction, if any; always preserved during truncation.
    System,
    /// A message from the end user.
    User,
    /// A message from the assistant (prior turn in the conversation).
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Construct a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Construct a `user` message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Construct an `assistant` message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Construct a `system` message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// `"role:content"`, the atom spec.md's fingerprint and similarity
    /// metric are built from.
    #[must_use]
    pub fn fingerprint_atom(&self) -> String {
        format!("{}:{}", self.role, self.content)
    }
}

/// Crude token estimate used for context-budget truncation: `ceil(len/4)`.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_atom_joins_role_and_content() {
        let m = Message::user("hello");
        assert_eq!(m.fingerprint_atom(), "user:hello");
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
