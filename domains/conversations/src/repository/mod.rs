//! Repository implementations for the Conversations domain
//!
//! Typed queries over the backend's collections. The repositories carry
//! no local state; every call goes to the external service.

pub mod conversations;
pub mod messages;

use std::sync::Arc;

use sidechat_backend::ChatBackend;

pub use conversations::ConversationRepository;
pub use messages::MessageRepository;

/// Combined repository access for the Conversations domain
#[derive(Clone)]
pub struct ConversationsRepositories {
    backend: Arc<dyn ChatBackend>,
    pub conversations: ConversationRepository,
    pub messages: MessageRepository,
}

impl ConversationsRepositories {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            conversations: ConversationRepository::new(Arc::clone(&backend)),
            messages: MessageRepository::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// Get a reference to the underlying backend (for subscriptions)
    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }
}
