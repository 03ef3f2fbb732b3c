use thiserror::Error;

use crate::types::Message;

/// Content shown in place of a deleted message.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Errors that can occur while applying message operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// An operation referenced a message ID that is not present in the buffer.
    #[error("message with id '{0}' was not found")]
    MissingMessage(String),
}

/// Message sequence of one open conversation.
///
/// Messages are only ever appended or tombstoned, never removed, so a
/// message keeps its position for as long as the conversation stays open.
/// Appends are deduplicated by server id so a message delivered twice shows
/// once.
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    conversation_id: Option<String>,
    messages: Vec<Message>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == message_id)
    }

    /// Switch to `conversation_id` ahead of its history.
    ///
    /// Reopening the conversation already shown keeps its messages; any other
    /// id starts from an empty buffer.
    pub fn open(&mut self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        if self.conversation_id.as_deref() == Some(conversation_id.as_str()) {
            return;
        }
        self.messages.clear();
        self.conversation_id = Some(conversation_id);
    }

    /// Replace the buffer with a fetched history for `conversation_id`.
    pub fn replace(&mut self, conversation_id: impl Into<String>, messages: Vec<Message>) {
        self.conversation_id = Some(conversation_id.into());
        self.messages.clear();
        for message in messages {
            self.append(message);
        }
    }

    /// Append a server-confirmed message.
    ///
    /// Returns `false` when the id is already present; the buffer is unchanged.
    pub fn append(&mut self, message: Message) -> bool {
        if self.get(&message.id).is_some() {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Mark a message deleted without moving it.
    pub fn tombstone(&mut self, message_id: &str) -> Result<(), TimelineError> {
        let message = self
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
            .ok_or_else(|| TimelineError::MissingMessage(message_id.to_owned()))?;
        message.content = DELETED_PLACEHOLDER.to_owned();
        message.is_deleted = true;
        Ok(())
    }

    /// Mark every message addressed to `reader` as read. Returns how many changed.
    pub fn mark_read_for(&mut self, reader: &str) -> usize {
        let mut changed = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|message| message.to_user == reader && !message.is_read)
        {
            message.is_read = true;
            changed += 1;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }
}
