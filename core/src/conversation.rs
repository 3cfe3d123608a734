use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{CurioError, CurioResult};
use crate::prompts::GREETING;
use crate::types::{Message, Role};

/// Chronological chat history of one session.
///
/// Always starts with the assistant greeting. Messages are only ever appended,
/// and only as `user` or `assistant`; `reset` drops everything but a fresh greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredConversation")]
pub struct ConversationStore {
    messages: Vec<Message>,
}

/// Wire shape of a dumped store, checked before it becomes a `ConversationStore`
#[derive(Deserialize)]
struct StoredConversation {
    messages: Vec<Message>,
}

impl TryFrom<StoredConversation> for ConversationStore {
    type Error = CurioError;

    fn try_from(stored: StoredConversation) -> CurioResult<Self> {
        let messages = stored.messages;
        match messages.first() {
            Some(first) if first.role == Role::Assistant => {}
            _ => {
                return Err(CurioError::ParsingError(
                    "conversation must start with the assistant greeting".to_string(),
                ))
            }
        }
        if messages.iter().any(|m| m.role == Role::System) {
            return Err(CurioError::ParsingError(
                "conversation must not contain system messages".to_string(),
            ));
        }
        Ok(Self { messages })
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Discards the history and starts over from the greeting
    pub fn reset(&mut self) {
        debug!(discarded = self.messages.len().saturating_sub(1), "Resetting conversation");
        self.messages = vec![Message::assistant(GREETING)];
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true; the greeting is always present
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages the user has sent
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}
