//! Message repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sidechat_backend::{ChatBackend, MessageSubscription};
use sidechat_common::{Error, Result};
use sidechat_domain::Message;

#[derive(Clone)]
pub struct MessageRepository {
    backend: Arc<dyn ChatBackend>,
}

impl MessageRepository {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Find message by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self.backend.find_message(id).await?)
    }

    /// All surviving messages of a conversation, timeline order
    pub async fn load_surviving(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        Ok(self.backend.surviving_messages(conversation_id).await?)
    }

    /// Persist a new message, returning the written row
    pub async fn insert(&self, message: &Message) -> Result<Message> {
        Ok(self.backend.insert_message(message).await?)
    }

    /// Most recent surviving message of a conversation
    pub async fn latest_surviving(&self, conversation_id: Uuid) -> Result<Option<Message>> {
        Ok(self
            .backend
            .latest_surviving_message(conversation_id)
            .await?)
    }

    /// Unread surviving messages not sent by `reader_id`
    pub async fn unread_count(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        Ok(self.backend.unread_count(conversation_id, reader_id).await?)
    }

    /// Mark every unread message from the other participant as read;
    /// returns rows affected (zero on a repeat call)
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64> {
        Ok(self
            .backend
            .mark_read(conversation_id, reader_id, read_at)
            .await?)
    }

    /// Set the deletion timestamp on a message
    pub async fn soft_delete(&self, message_id: Uuid, deleted_at: DateTime<Utc>) -> Result<Message> {
        self.backend
            .soft_delete_message(message_id, deleted_at)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Message {} not found", message_id)))
    }

    /// Open a realtime subscription, optionally scoped to a conversation
    pub async fn subscribe(&self, conversation_id: Option<Uuid>) -> Result<MessageSubscription> {
        Ok(self.backend.subscribe_messages(conversation_id).await?)
    }
}
