//! Mock backend implementation
//!
//! In-memory tables with synchronous realtime fan-out, for testing and
//! development without an external service. Delivery is in commit order
//! per table, which satisfies (and is stricter than) the at-least-once,
//! unordered contract; tests can inject duplicates with [`MockBackend::emit`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use sidechat_domain::{Conversation, Membership, Message, MessageChange, Participant};

use crate::{BackendError, ChatBackend, MessageSubscription};

struct Subscriber {
    conversation_id: Option<Uuid>,
    sender: mpsc::UnboundedSender<MessageChange>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<Uuid, Participant>,
    conversations: HashMap<Uuid, Conversation>,
    memberships: Vec<Membership>,
    messages: HashMap<Uuid, Message>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber_id: u64,
    fail_next_membership_insert: bool,
    fail_next_message_insert: bool,
}

impl Inner {
    fn fan_out(&mut self, change: MessageChange) {
        let conversation_id = change.conversation_id();
        self.subscribers.retain(|_, sub| {
            if sub.conversation_id.is_some_and(|c| c != conversation_id) {
                return true;
            }
            // A failed send means the receiver is gone; prune it
            sub.sender.send(change.clone()).is_ok()
        });
    }
}

/// Mock backend for testing
#[derive(Clone)]
pub struct MockBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Register a participant profile
    pub fn seed_profile(&self, profile: Participant) {
        self.inner
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id, profile);
    }

    /// Register a participant with a generated id
    pub fn seed_participant(&self, username: &str) -> Participant {
        let profile = Participant {
            id: Uuid::new_v4(),
            username: username.to_string(),
            avatar_url: None,
        };
        self.seed_profile(profile.clone());
        profile
    }

    /// Number of live realtime subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.inner.lock().unwrap().subscribers.len()
    }

    /// Make the next membership insert fail with a backend error
    pub fn fail_next_membership_insert(&self) {
        self.inner.lock().unwrap().fail_next_membership_insert = true;
    }

    /// Make the next message insert fail with a backend error
    pub fn fail_next_message_insert(&self) {
        self.inner.lock().unwrap().fail_next_message_insert = true;
    }

    /// Deliver a change to matching subscribers without touching stored
    /// rows. Lets tests simulate duplicate or out-of-order delivery.
    pub fn emit(&self, change: MessageChange) {
        self.inner.lock().unwrap().fan_out(change);
    }

    /// Stored row count for the messages table (soft-deleted included)
    pub fn message_row_count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }
}

impl Default for MockBackend {
    #[mutants::skip] // Delegates to MockBackend::new()
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Participant>, BackendError> {
        Ok(self.inner.lock().unwrap().profiles.get(&id).cloned())
    }

    async fn insert_conversation(&self) -> Result<Conversation, BackendError> {
        let conv = Conversation::new();
        self.inner
            .lock()
            .unwrap()
            .conversations
            .insert(conv.id, conv.clone());
        Ok(conv)
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, BackendError> {
        Ok(self.inner.lock().unwrap().conversations.get(&id).cloned())
    }

    async fn set_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Option<Uuid>,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let conv = inner
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| {
                BackendError::Response(format!("conversation {} does not exist", conversation_id))
            })?;
        conv.last_message_id = message_id;
        Ok(())
    }

    async fn insert_membership(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Membership, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_membership_insert {
            inner.fail_next_membership_insert = false;
            return Err(BackendError::Response(
                "membership insert rejected".to_string(),
            ));
        }
        let membership = Membership {
            conversation_id,
            user_id,
        };
        inner.memberships.push(membership);
        Ok(membership)
    }

    async fn memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Membership>, BackendError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .copied()
            .collect())
    }

    async fn memberships_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Membership>, BackendError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .memberships
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .copied()
            .collect())
    }

    async fn insert_message(&self, message: &Message) -> Result<Message, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_message_insert {
            inner.fail_next_message_insert = false;
            return Err(BackendError::Response("message insert rejected".to_string()));
        }
        inner.messages.insert(message.id, message.clone());
        inner.fan_out(MessageChange::Inserted(message.clone()));
        Ok(message.clone())
    }

    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, BackendError> {
        Ok(self.inner.lock().unwrap().messages.get(&id).cloned())
    }

    async fn surviving_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, BackendError> {
        let mut messages: Vec<Message> = self
            .inner
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.deleted_at.is_none())
            .cloned()
            .collect();
        messages.sort_by_key(Message::sort_key);
        Ok(messages)
    }

    async fn latest_surviving_message(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Message>, BackendError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id && m.deleted_at.is_none())
            .max_by_key(|m| m.sort_key())
            .cloned())
    }

    async fn unread_count(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, BackendError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && m.sender_id != reader_id
                    && m.read_at.is_none()
                    && m.deleted_at.is_none()
            })
            .count() as u64)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let mut updated: Vec<Message> = Vec::new();
        for message in inner.messages.values_mut() {
            if message.conversation_id == conversation_id
                && message.sender_id != reader_id
                && message.read_at.is_none()
                && message.deleted_at.is_none()
            {
                message.read_at = Some(read_at);
                updated.push(message.clone());
            }
        }
        // One update event per patched row, in timeline order
        updated.sort_by_key(Message::sort_key);
        let affected = updated.len() as u64;
        for message in updated {
            inner.fan_out(MessageChange::Updated(message));
        }
        Ok(affected)
    }

    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<Option<Message>, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(message) = inner.messages.get_mut(&message_id) else {
            return Ok(None);
        };
        if message.deleted_at.is_some() {
            // Already deleted; keep the original timestamp, emit nothing
            return Ok(Some(message.clone()));
        }
        message.deleted_at = Some(deleted_at);
        let patched = message.clone();
        inner.fan_out(MessageChange::Updated(patched.clone()));
        Ok(Some(patched))
    }

    async fn subscribe_messages(
        &self,
        conversation_id: Option<Uuid>,
    ) -> Result<MessageSubscription, BackendError> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = {
            let mut inner = self.inner.lock().unwrap();
            let id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;
            inner.subscribers.insert(
                id,
                Subscriber {
                    conversation_id,
                    sender,
                },
            );
            id
        };

        let inner = Arc::clone(&self.inner);
        Ok(MessageSubscription::new(
            receiver,
            Box::new(move || {
                inner.lock().unwrap().subscribers.remove(&id);
                tracing::debug!(subscription_id = id, "mock subscription released");
            }),
        ))
    }
}
