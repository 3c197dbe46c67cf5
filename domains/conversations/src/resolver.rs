//! Conversation resolver
//!
//! Maps an unordered pair of participants to their single shared
//! conversation, creating it (with both membership rows) on first
//! contact. Two participants resolving concurrently for the first time
//! can each miss the other's in-flight creation and end up with two
//! conversations; that race is accepted and kept visible rather than
//! papered over — later calls converge on the smallest id. A uniqueness
//! constraint on the pair belongs at the storage layer.

use uuid::Uuid;

use sidechat_common::{Error, Result};

use crate::repository::ConversationRepository;

pub struct ConversationResolver {
    repo: ConversationRepository,
}

impl ConversationResolver {
    pub fn new(repo: ConversationRepository) -> Self {
        Self { repo }
    }

    /// Resolve the conversation between the local participant and
    /// another, creating it if none exists yet.
    ///
    /// Symmetric and stable: `resolve(a, b)` and `resolve(b, a)` return
    /// the same id once a conversation exists.
    pub async fn resolve(&self, local_id: Uuid, other_id: Uuid) -> Result<Uuid> {
        if local_id == other_id {
            return Err(Error::Validation(
                "Cannot resolve a conversation with yourself".to_string(),
            ));
        }

        if let Some(id) = self.repo.shared_conversation(local_id, other_id).await? {
            tracing::debug!(conversation_id = %id, "resolved existing conversation");
            return Ok(id);
        }

        let id = self.repo.create_with_members(local_id, other_id).await?;
        tracing::info!(conversation_id = %id, "created conversation");
        Ok(id)
    }
}
