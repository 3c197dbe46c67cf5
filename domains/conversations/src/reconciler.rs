//! Event reconciler
//!
//! Pumps raw realtime changes into the in-memory views. Each feed owns a
//! subscription and a background task: changes are classified into tagged
//! [`MessageEvent`]s and applied under the view's lock, so delivery
//! order, duplicates, and foreign-conversation noise are all absorbed by
//! the views' idempotent `apply_event` paths.
//!
//! Aborting the task drops the subscription, which releases the channel
//! on the backend side. There is no reconnect: once the stream closes the
//! view is stale until reloaded.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use sidechat_backend::MessageSubscription;
use sidechat_domain::MessageEvent;

use crate::chat_list::ChatList;
use crate::store::MessageStore;

/// Background reconciliation of one conversation's message store
pub struct MessageFeed {
    task: JoinHandle<()>,
}

impl MessageFeed {
    /// Start pumping `subscription` into `store`.
    ///
    /// The subscription should be scoped to the store's conversation;
    /// events for other conversations are ignored either way.
    pub fn spawn(store: Arc<Mutex<MessageStore>>, mut subscription: MessageSubscription) -> Self {
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                if let Some(event) = MessageEvent::classify(change) {
                    store.lock().await.apply_event(event);
                }
            }
            tracing::warn!("message stream closed; store is no longer live");
        });
        Self { task }
    }

    /// Stop the feed and release its subscription
    pub fn shutdown(self) {}
}

impl Drop for MessageFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Background reconciliation of a participant's chat list, driven by an
/// unscoped subscription
pub struct ChatFeed {
    task: JoinHandle<()>,
}

impl ChatFeed {
    pub fn spawn(list: Arc<Mutex<ChatList>>, mut subscription: MessageSubscription) -> Self {
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                let Some(event) = MessageEvent::classify(change) else {
                    continue;
                };
                let conversation_id = event.conversation_id();
                if let Err(e) = list.lock().await.apply_event(event).await {
                    // A single bad event must not kill the feed
                    tracing::warn!(%conversation_id, error = %e, "failed to apply event to chat list");
                }
            }
            tracing::warn!("message stream closed; chat list is no longer live");
        });
        Self { task }
    }

    /// Stop the feed and release its subscription
    pub fn shutdown(self) {}
}

impl Drop for ChatFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
