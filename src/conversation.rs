//! Conversation history and the in-progress assistant message.
//!
//! [`Conversation`] owns every finalized [`Message`] of a session.  Roles
//! alternate user/assistant after optional leading system messages, and at
//! most one assistant message is open at any time.  Operations that would
//! break either rule fail with [`Error::InvalidState`].

use crate::error::{Error, Result};
use crate::types::{Message, Role, StreamEvent};

/// An assistant message that is still receiving deltas.
#[derive(Debug, Default, Clone)]
struct InProgress {
    content: String,
    thinking: String,
}

/// Ordered message history plus a turn counter.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    open: Option<InProgress>,
    turns: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a system message.  Only valid before the first user message.
    pub fn append_system(&mut self, text: impl Into<String>) -> Result<()> {
        if self.messages.iter().any(|m| m.role != Role::System) || self.open.is_some() {
            return Err(Error::invalid_state(
                "system messages must precede the conversation",
            ));
        }
        let ordinal = self.next_ordinal();
        self.messages.push(Message::system(text, ordinal));
        Ok(())
    }

    /// Appends a finalized user message.
    pub fn append_user(&mut self, text: impl Into<String>) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::invalid_state(
                "cannot add a user message while an assistant message is in progress",
            ));
        }
        if self.last_role() == Some(Role::User) {
            return Err(Error::invalid_state(
                "the previous user message has not been answered",
            ));
        }
        let ordinal = self.next_ordinal();
        self.messages.push(Message::user(text, ordinal));
        Ok(())
    }

    /// Removes a trailing user message that never got an answer.
    ///
    /// Returns the removed message, or `None` when the last message is not a
    /// user message or an assistant message is in progress.
    pub fn rollback_user(&mut self) -> Option<Message> {
        if self.open.is_none() && self.last_role() == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Opens an empty in-progress assistant message.
    pub fn begin_assistant(&mut self) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::invalid_state(
                "an assistant message is already in progress",
            ));
        }
        if self.last_role() != Some(Role::User) {
            return Err(Error::invalid_state(
                "an assistant message must answer a user message",
            ));
        }
        self.open = Some(InProgress::default());
        Ok(())
    }

    /// Applies a decoded event to the in-progress assistant message.
    ///
    /// Text and thinking deltas are appended to their respective content;
    /// every other event is a no-op.
    pub fn apply_delta(&mut self, event: &StreamEvent) -> Result<()> {
        let Some(open) = self.open.as_mut() else {
            return Err(Error::invalid_state("no assistant message is in progress"));
        };
        match event {
            StreamEvent::TextDelta(text) => open.content.push_str(text),
            StreamEvent::ThinkingDelta(text) => open.thinking.push_str(text),
            StreamEvent::Search(_)
            | StreamEvent::Image(_)
            | StreamEvent::Done
            | StreamEvent::Error(_) => {}
        }
        Ok(())
    }

    /// Closes the in-progress assistant message and appends it to history.
    pub fn finalize_assistant(&mut self) -> Result<&Message> {
        let Some(open) = self.open.take() else {
            return Err(Error::invalid_state("no assistant message is in progress"));
        };
        let ordinal = self.next_ordinal();
        self.messages
            .push(Message::assistant(open.content, open.thinking, ordinal));
        self.turns += 1;
        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Clears all history, any in-progress message, and the turn counter.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.open = None;
        self.turns = 0;
    }

    /// The finalized messages in conversation order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Number of completed turns.
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Returns true while an assistant message is in progress.
    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|m| m.role)
    }

    fn next_ordinal(&self) -> u64 {
        self.messages.len() as u64
    }
}
