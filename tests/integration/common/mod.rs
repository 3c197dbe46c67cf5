//! Common test utilities and fixtures for the sync integration tests
//!
//! Provides:
//! - A seeded mock backend with two participants
//! - Live session fixtures (message store + feed, chat list + feed)
//! - A polling helper for asserting on asynchronously applied events

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use uuid::Uuid;

use sidechat_backend::mock::MockBackend;
use sidechat_backend::ChatBackend;
use sidechat_conversations::{
    ChatFeed, ChatList, ConversationResolver, ConversationsRepositories, MessageFeed, MessageStore,
};
use sidechat_domain::{Message, Participant};

/// Shared backend with two seeded participants
pub struct TestWorld {
    pub backend: MockBackend,
    pub repos: ConversationsRepositories,
    pub alice: Participant,
    pub bob: Participant,
}

impl TestWorld {
    pub fn new() -> Self {
        let backend = MockBackend::new();
        let alice = backend.seed_participant("alice");
        let bob = backend.seed_participant("bob");
        let repos =
            ConversationsRepositories::new(Arc::new(backend.clone()) as Arc<dyn ChatBackend>);
        Self {
            backend,
            repos,
            alice,
            bob,
        }
    }

    pub fn resolver(&self) -> ConversationResolver {
        ConversationResolver::new(self.repos.conversations.clone())
    }

    /// Resolve the alice/bob conversation, creating it on first call
    pub async fn resolve(&self) -> Result<Uuid> {
        Ok(self.resolver().resolve(self.alice.id, self.bob.id).await?)
    }
}

/// One participant's live view of a conversation: loaded store plus a
/// running feed over a scoped subscription
pub struct Session {
    pub store: Arc<Mutex<MessageStore>>,
    pub user_id: Uuid,
    _feed: MessageFeed,
}

impl Session {
    pub async fn open(world: &TestWorld, conversation_id: Uuid, user_id: Uuid) -> Result<Self> {
        let subscription = world.backend.subscribe_messages(Some(conversation_id)).await?;
        let mut store = MessageStore::new(conversation_id, world.repos.clone());
        store.load().await?;
        let store = Arc::new(Mutex::new(store));
        let feed = MessageFeed::spawn(Arc::clone(&store), subscription);
        Ok(Self {
            store,
            user_id,
            _feed: feed,
        })
    }

    pub async fn send_text(&self, content: &str) -> Result<Message> {
        let store = self.store.lock().await;
        Ok(store
            .send(self.user_id, Some(content.to_string()), None)
            .await?)
    }

    pub async fn mark_read(&self) -> Result<u64> {
        Ok(self.store.lock().await.mark_read(self.user_id).await?)
    }

    pub async fn delete(&self, message_id: Uuid) -> Result<()> {
        Ok(self
            .store
            .lock()
            .await
            .soft_delete(message_id, self.user_id)
            .await?)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.store.lock().await.messages().to_vec()
    }
}

/// One participant's live sidebar: loaded chat list plus a running feed
/// over an unscoped subscription
pub struct Sidebar {
    pub list: Arc<Mutex<ChatList>>,
    _feed: ChatFeed,
}

impl Sidebar {
    pub async fn open(world: &TestWorld, user_id: Uuid) -> Result<Self> {
        let subscription = world.backend.subscribe_messages(None).await?;
        let mut list = ChatList::new(user_id, world.repos.clone());
        list.load().await?;
        let list = Arc::new(Mutex::new(list));
        let feed = ChatFeed::spawn(Arc::clone(&list), subscription);
        Ok(Self { list, _feed: feed })
    }

    /// Snapshot of `(preview, unread_count)` for one conversation, if listed
    pub async fn row(&self, conversation_id: Uuid) -> Option<(String, u64)> {
        self.list
            .lock()
            .await
            .items()
            .iter()
            .find(|item| item.conversation_id == conversation_id)
            .map(|item| (item.preview.clone(), item.unread_count))
    }
}

/// Poll an async probe until it returns true; panics after ~1s
pub async fn wait_until<F, Fut>(probe: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if probe().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
