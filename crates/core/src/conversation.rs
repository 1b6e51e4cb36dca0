//! Conversation types: messages and per-persona conversation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Typed or voice-derived user input
    User,
    /// Answer from the persona, or a synthetic failure notice
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single message. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// History and in-flight flag for one persona.
///
/// `pending` is true while exactly one request for this persona is in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    history: Vec<Message>,
    pending: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in the order they were appended
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Append a message; existing messages are never reordered
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    /// Drop the whole history. Callers must not clear while a request is pending.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Last assistant message, if any
    pub fn last_assistant(&self) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.is_assistant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("hello");
        assert_eq!(msg.role, Role::User);
        assert!(!msg.is_assistant());
        assert!(Message::assistant("hi").is_assistant());
    }

    #[test]
    fn test_conversation_append_order() {
        let mut state = ConversationState::new();
        state.push(Message::user("one"));
        state.push(Message::assistant("two"));
        state.push(Message::user("three"));

        let contents: Vec<_> = state.history().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(state.last_assistant().map(|m| m.content.as_str()), Some("two"));
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
