//! Conversations domain: two-party messaging with realtime sync
//!
//! The pieces compose the way a chat session does:
//! - [`ConversationResolver`] finds or creates the conversation shared by
//!   two participants
//! - [`MessageStore`] holds one conversation's ordered message log and
//!   carries the write operations (send, mark read, soft delete)
//! - [`MessageFeed`] / [`ChatFeed`] pump realtime events into the store
//!   and the chat list
//! - [`ChatList`] aggregates last-message previews and unread counters
//!   across every conversation of the local participant

pub mod chat_list;
pub mod reconciler;
pub mod repository;
pub mod resolver;
pub mod store;

// Re-export the domain types at the crate root for convenience
pub use chat_list::{ChatItem, ChatList};
pub use reconciler::{ChatFeed, MessageFeed};
pub use repository::{ConversationRepository, ConversationsRepositories, MessageRepository};
pub use resolver::ConversationResolver;
pub use store::MessageStore;
