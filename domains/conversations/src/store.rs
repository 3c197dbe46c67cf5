//! Message store
//!
//! One conversation's ordered message log plus the write operations that
//! act on it. The log holds surviving messages only, ascending by
//! `(created_at, id)`.
//!
//! Writes never touch the log directly: a sent message is acknowledged
//! remotely and then comes back through the event stream, so there is a
//! single mutation path ([`MessageStore::apply_event`]) and the writer —
//! who is also a subscriber — cannot double-insert.

use chrono::Utc;
use uuid::Uuid;

use sidechat_common::{Error, Result};
use sidechat_domain::{Attachment, Message, MessageEvent};

use crate::repository::ConversationsRepositories;

pub struct MessageStore {
    conversation_id: Uuid,
    repos: ConversationsRepositories,
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new(conversation_id: Uuid, repos: ConversationsRepositories) -> Self {
        Self {
            conversation_id,
            repos,
            messages: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// The current in-memory timeline
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Fetch the conversation's surviving messages, replacing any prior
    /// in-memory state.
    pub async fn load(&mut self) -> Result<&[Message]> {
        let mut messages = self.repos.messages.load_surviving(self.conversation_id).await?;
        // The backend orders the range read; enforce the tie-break anyway
        messages.sort_by_key(Message::sort_key);
        self.messages = messages;
        Ok(&self.messages)
    }

    /// Send a message.
    ///
    /// Validates, persists, and repoints the conversation's last-message
    /// pointer. The returned row is the remote acknowledgment; it is not
    /// appended to the local timeline here.
    pub async fn send(
        &self,
        sender_id: Uuid,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message> {
        let message = Message::new(self.conversation_id, sender_id, content, attachment)?;
        let created = self.repos.messages.insert(&message).await?;
        self.repos
            .conversations
            .repoint_last_message(self.conversation_id, Some(created.id))
            .await?;
        tracing::debug!(message_id = %created.id, conversation_id = %self.conversation_id, "message sent");
        Ok(created)
    }

    /// Mark every unread message from the other participant as read.
    /// Idempotent: a repeat call affects zero rows.
    pub async fn mark_read(&self, reader_id: Uuid) -> Result<u64> {
        self.repos
            .messages
            .mark_read(self.conversation_id, reader_id, Utc::now())
            .await
    }

    /// Soft-delete a message. Only the sender may delete; deleting an
    /// already-deleted message is a no-op. Repairs the conversation's
    /// last-message pointer when the deleted message was its target.
    pub async fn soft_delete(&self, message_id: Uuid, requested_by: Uuid) -> Result<()> {
        let message = self
            .repos
            .messages
            .find(message_id)
            .await?
            .filter(|m| m.conversation_id == self.conversation_id)
            .ok_or_else(|| Error::NotFound(format!("Message {} not found", message_id)))?;

        if message.sender_id != requested_by {
            return Err(Error::Validation(
                "Only the sender can delete a message".to_string(),
            ));
        }
        if message.is_deleted() {
            return Ok(());
        }

        self.repos
            .messages
            .soft_delete(message_id, Utc::now())
            .await?;

        let conv = self
            .repos
            .conversations
            .find(self.conversation_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Conversation {} not found", self.conversation_id))
            })?;

        if conv.last_message_id == Some(message_id) {
            let next = self
                .repos
                .messages
                .latest_surviving(self.conversation_id)
                .await?;
            self.repos
                .conversations
                .repoint_last_message(self.conversation_id, next.map(|m| m.id))
                .await?;
        }
        Ok(())
    }

    /// Apply one realtime event to the timeline.
    ///
    /// Idempotent against duplicate delivery; events for other
    /// conversations are ignored.
    pub fn apply_event(&mut self, event: MessageEvent) {
        if event.conversation_id() != self.conversation_id {
            return;
        }
        match event {
            MessageEvent::Inserted(message) => {
                if message.is_deleted() {
                    return;
                }
                if self.messages.iter().any(|m| m.id == message.id) {
                    return;
                }
                let position = self
                    .messages
                    .partition_point(|m| m.sort_key() <= message.sort_key());
                self.messages.insert(position, message);
            }
            MessageEvent::MarkedRead {
                message_id,
                read_at,
                ..
            } => {
                if let Some(message) = self.messages.iter_mut().find(|m| m.id == message_id) {
                    // Read marking is one-way; keep the first timestamp
                    if message.read_at.is_none() {
                        message.read_at = Some(read_at);
                    }
                }
            }
            MessageEvent::SoftDeleted { message_id, .. } => {
                self.messages.retain(|m| m.id != message_id);
            }
        }
    }
}
