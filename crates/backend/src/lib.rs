//! Sidechat persistence and realtime backend
//!
//! The client core talks to an external persistence/realtime service
//! through the [`ChatBackend`] trait, with support for:
//! - Supabase PostgREST integration for production reads and writes
//! - Mock backend with in-memory tables and realtime fan-out for
//!   testing and development
//! - Configurable provider selection from the environment
//!
//! Realtime delivery is at-least-once with no ordering guarantee across
//! subscriptions and no replay of events missed while disconnected;
//! consumers are expected to reconcile idempotently.

pub mod mock;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use sidechat_common::Error;
use sidechat_domain::{Conversation, Membership, Message, MessageChange, Participant};

#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Backend configuration error: {0}")]
    Configuration(String),

    #[error("Backend request error: {0}")]
    Request(String),

    #[error("Backend response error: {0}")]
    Response(String),

    #[error("Backend subscription error: {0}")]
    Subscription(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Request(e.to_string())
    }
}

impl From<BackendError> for Error {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Subscription(msg) => Error::Subscription(msg),
            other => Error::Persistence(other.to_string()),
        }
    }
}

/// Backend configuration.
#[derive(Clone)]
pub struct BackendConfig {
    /// Backend provider (supabase, mock)
    pub provider: String,
    /// Supabase project URL
    pub supabase_url: Option<String>,
    /// Supabase anon key sent with every request
    pub supabase_anon_key: Option<String>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("supabase_url", &self.supabase_url)
            .field(
                "supabase_anon_key",
                &self.supabase_anon_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl BackendConfig {
    /// Create backend config from environment variables.
    pub fn from_env() -> Result<Self, BackendError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("BACKEND_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let supabase_url = std::env::var("SUPABASE_URL").ok();
        let supabase_anon_key = std::env::var("SUPABASE_ANON_KEY").ok();

        if provider == "supabase" && (supabase_url.is_none() || supabase_anon_key.is_none()) {
            return Err(BackendError::Configuration(
                "SUPABASE_URL and SUPABASE_ANON_KEY are required for the supabase provider"
                    .to_string(),
            ));
        }

        Ok(Self {
            provider,
            supabase_url,
            supabase_anon_key,
        })
    }
}

/// Handle for a live message subscription.
///
/// The subscription is a scoped resource: dropping the handle (or calling
/// [`MessageSubscription::unsubscribe`]) releases the underlying channel
/// on every exit path.
pub struct MessageSubscription {
    receiver: mpsc::UnboundedReceiver<MessageChange>,
    _guard: SubscriptionGuard,
}

impl MessageSubscription {
    pub(crate) fn new(
        receiver: mpsc::UnboundedReceiver<MessageChange>,
        on_release: Box<dyn FnOnce() + Send>,
    ) -> Self {
        Self {
            receiver,
            _guard: SubscriptionGuard {
                on_release: Some(on_release),
            },
        }
    }

    /// Receive the next change; `None` once the channel has closed.
    pub async fn next(&mut self) -> Option<MessageChange> {
        self.receiver.recv().await
    }

    /// Release the subscription explicitly.
    pub fn unsubscribe(self) {}
}

struct SubscriptionGuard {
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

/// Backend trait over the three collections the core reads and writes
/// (conversations, conversation memberships, messages), the profile
/// lookup, and the realtime message channel.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    // --- profiles ---

    /// Point read of a participant profile
    async fn find_profile(&self, id: Uuid) -> Result<Option<Participant>, BackendError>;

    // --- conversations ---

    /// Insert a new conversation row
    async fn insert_conversation(&self) -> Result<Conversation, BackendError>;

    /// Point read of a conversation
    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, BackendError>;

    /// Replace a conversation's denormalized last-message pointer
    async fn set_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Option<Uuid>,
    ) -> Result<(), BackendError>;

    // --- memberships ---

    /// Insert a membership row
    async fn insert_membership(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Membership, BackendError>;

    /// All memberships of a participant
    async fn memberships_for_user(&self, user_id: Uuid)
        -> Result<Vec<Membership>, BackendError>;

    /// All memberships of a conversation
    async fn memberships_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Membership>, BackendError>;

    // --- messages ---

    /// Insert a message row, returning the written row
    async fn insert_message(&self, message: &Message) -> Result<Message, BackendError>;

    /// Point read of a message
    async fn find_message(&self, id: Uuid) -> Result<Option<Message>, BackendError>;

    /// All messages of a conversation with no deletion timestamp,
    /// ascending by creation timestamp (id tie-break)
    async fn surviving_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, BackendError>;

    /// Most recent surviving message of a conversation, if any
    async fn latest_surviving_message(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Message>, BackendError>;

    /// Count of unread, surviving messages not sent by `reader_id`
    async fn unread_count(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, BackendError>;

    /// Set the read timestamp on every unread, surviving message in the
    /// conversation not sent by `reader_id`; returns rows affected
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<u64, BackendError>;

    /// Set the deletion timestamp on a message, returning the patched row
    async fn soft_delete_message(
        &self,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> Result<Option<Message>, BackendError>;

    // --- realtime ---

    /// Subscribe to message changes, optionally scoped to one
    /// conversation. Unscoped subscriptions feed the chat list.
    async fn subscribe_messages(
        &self,
        conversation_id: Option<Uuid>,
    ) -> Result<MessageSubscription, BackendError>;
}

/// Factory for creating [`ChatBackend`] implementations.
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend based on configuration.
    pub fn create(config: BackendConfig) -> Result<Arc<dyn ChatBackend>, BackendError> {
        match config.provider.as_str() {
            "supabase" => {
                tracing::info!("Creating Supabase REST backend");
                Ok(Arc::new(supabase::SupabaseBackend::new(&config)?))
            }
            "mock" => {
                tracing::info!("Creating mock backend");
                Ok(Arc::new(mock::MockBackend::new()))
            }
            provider => Err(BackendError::Configuration(format!(
                "Unknown backend provider: {}. Supported providers: supabase, mock",
                provider
            ))),
        }
    }
}
