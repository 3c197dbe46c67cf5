//! Conversation list aggregator
//!
//! One participant's sidebar: every conversation they belong to, with
//! the other member's profile, a one-line preview of the latest
//! surviving message, and an unread counter. Kept current by feeding it
//! the same tagged events the message stores consume.
//!
//! Counters are recomputed from the backend on each relevant event
//! instead of incremented locally, so duplicate delivery cannot drift
//! them.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sidechat_common::{Error, Result};
use sidechat_domain::{Message, MessageEvent, Participant};

use crate::repository::ConversationsRepositories;

/// Preview shown for a conversation with no surviving messages
const EMPTY_PREVIEW: &str = "No messages yet";

/// Most recent message first; conversations with no messages sort last
fn display_order(a: &ChatItem, b: &ChatItem) -> std::cmp::Ordering {
    match (a.last_message_id.is_some(), b.last_message_id.is_some()) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => b.activity_at.cmp(&a.activity_at),
    }
}

/// One sidebar row
#[derive(Debug, Clone)]
pub struct ChatItem {
    pub conversation_id: Uuid,
    pub other: Participant,
    pub preview: String,
    pub unread_count: u64,
    last_message_id: Option<Uuid>,
    activity_at: DateTime<Utc>,
}

pub struct ChatList {
    local_id: Uuid,
    repos: ConversationsRepositories,
    open_conversation: Option<Uuid>,
    items: Vec<ChatItem>,
}

impl ChatList {
    pub fn new(local_id: Uuid, repos: ConversationsRepositories) -> Self {
        Self {
            local_id,
            repos,
            open_conversation: None,
            items: Vec::new(),
        }
    }

    /// Rows in display order, most recent activity first
    pub fn items(&self) -> &[ChatItem] {
        &self.items
    }

    /// Mark a conversation as the one currently on screen.
    ///
    /// Zeroes the unread counter optimistically, then persists the read
    /// marks; the echoed read event confirms as a no-op. A failed write
    /// surfaces the error but leaves the optimistic zero in place (the
    /// next reload recounts).
    pub async fn open(&mut self, conversation_id: Uuid) -> Result<()> {
        self.open_conversation = Some(conversation_id);
        if let Some(item) = self.item_mut(conversation_id) {
            item.unread_count = 0;
        }
        self.repos
            .messages
            .mark_read(conversation_id, self.local_id, Utc::now())
            .await?;
        Ok(())
    }

    /// No conversation is on screen anymore
    pub fn close(&mut self) {
        self.open_conversation = None;
    }

    /// Rebuild the whole list from the backend, replacing any prior
    /// in-memory state. Conversations with fewer than two members are
    /// skipped.
    pub async fn load(&mut self) -> Result<&[ChatItem]> {
        let memberships = self.repos.conversations.memberships_for(self.local_id).await?;

        let mut items = Vec::with_capacity(memberships.len());
        for membership in memberships {
            match self.build_item(membership.conversation_id).await? {
                Some(item) => items.push(item),
                None => tracing::warn!(
                    conversation_id = %membership.conversation_id,
                    "skipping conversation without a second member"
                ),
            }
        }

        items.sort_by(display_order);
        self.items = items;
        Ok(&self.items)
    }

    /// Apply one realtime event to the list.
    ///
    /// An insert for an unknown conversation pulls the full row in; this
    /// is how a first message from a new contact shows up without a
    /// reload.
    pub async fn apply_event(&mut self, event: MessageEvent) -> Result<()> {
        match event {
            MessageEvent::Inserted(message) => self.on_inserted(message).await,
            MessageEvent::MarkedRead {
                conversation_id, ..
            } => {
                // A read update means the conversation was looked at;
                // reset rather than recount
                if let Some(item) = self.item_mut(conversation_id) {
                    item.unread_count = 0;
                }
                Ok(())
            }
            MessageEvent::SoftDeleted {
                conversation_id,
                message_id,
                ..
            } => self.on_soft_deleted(conversation_id, message_id).await,
        }
    }

    async fn on_inserted(&mut self, message: Message) -> Result<()> {
        if message.is_deleted() {
            return Ok(());
        }
        let conversation_id = message.conversation_id;

        if self.item_mut(conversation_id).is_none() {
            match self.build_item(conversation_id).await? {
                Some(item) => self.items.push(item),
                None => {
                    tracing::warn!(%conversation_id, "insert event for conversation without a second member");
                    return Ok(());
                }
            }
        }

        let unread = self.refresh_unread(conversation_id).await?;
        let local_id = self.local_id;
        if let Some(item) = self.item_mut(conversation_id) {
            if item.last_message_id != Some(message.id) && message.created_at >= item.activity_at {
                item.preview = message.preview_for(local_id);
                item.last_message_id = Some(message.id);
                item.activity_at = message.created_at;
            }
            item.unread_count = unread;
        }
        self.items.sort_by(display_order);
        Ok(())
    }

    async fn on_soft_deleted(&mut self, conversation_id: Uuid, message_id: Uuid) -> Result<()> {
        let showing_deleted = self
            .item_mut(conversation_id)
            .map(|item| item.last_message_id == Some(message_id))
            .unwrap_or(false);

        if showing_deleted {
            let latest = self.repos.messages.latest_surviving(conversation_id).await?;
            let local_id = self.local_id;
            if let Some(item) = self.item_mut(conversation_id) {
                match latest {
                    Some(message) => {
                        item.preview = message.preview_for(local_id);
                        item.last_message_id = Some(message.id);
                    }
                    None => {
                        item.preview = EMPTY_PREVIEW.to_string();
                        item.last_message_id = None;
                    }
                }
            }
        }

        // The deleted message may have been counted as unread
        if self.item_mut(conversation_id).is_some() {
            let unread = self.refresh_unread(conversation_id).await?;
            if let Some(item) = self.item_mut(conversation_id) {
                item.unread_count = unread;
            }
            self.items.sort_by(display_order);
        }
        Ok(())
    }

    async fn refresh_unread(&self, conversation_id: Uuid) -> Result<u64> {
        if self.open_conversation == Some(conversation_id) {
            return Ok(0);
        }
        self.repos
            .messages
            .unread_count(conversation_id, self.local_id)
            .await
    }

    fn item_mut(&mut self, conversation_id: Uuid) -> Option<&mut ChatItem> {
        self.items
            .iter_mut()
            .find(|item| item.conversation_id == conversation_id)
    }

    /// Assemble a row from the backend. Returns `None` when the
    /// conversation has no member besides the local participant.
    async fn build_item(&self, conversation_id: Uuid) -> Result<Option<ChatItem>> {
        let conversation = self
            .repos
            .conversations
            .find(conversation_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Conversation {} not found", conversation_id))
            })?;

        let Some(other_id) = self
            .repos
            .conversations
            .other_member(conversation_id, self.local_id)
            .await?
        else {
            return Ok(None);
        };
        let Some(other) = self.repos.conversations.participant(other_id).await? else {
            return Ok(None);
        };

        // The pointer can lag behind a delete; fall back to the range read
        let last_message = match conversation.last_message_id {
            Some(id) => match self.repos.messages.find(id).await? {
                Some(m) if !m.is_deleted() => Some(m),
                _ => self.repos.messages.latest_surviving(conversation_id).await?,
            },
            None => self.repos.messages.latest_surviving(conversation_id).await?,
        };

        let unread = self.refresh_unread(conversation_id).await?;
        let (preview, last_message_id, activity_at) = match last_message {
            Some(m) => (
                m.preview_for(self.local_id),
                Some(m.id),
                m.created_at,
            ),
            None => (EMPTY_PREVIEW.to_string(), None, conversation.created_at),
        };

        Ok(Some(ChatItem {
            conversation_id,
            other,
            preview,
            unread_count: unread,
            last_message_id,
            activity_at,
        }))
    }
}
