//! Conversation repository

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use sidechat_backend::ChatBackend;
use sidechat_common::{Error, Result};
use sidechat_domain::{Conversation, Membership, Participant};

#[derive(Clone)]
pub struct ConversationRepository {
    backend: Arc<dyn ChatBackend>,
}

impl ConversationRepository {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// Find conversation by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.backend.find_conversation(id).await?)
    }

    /// All memberships of a participant
    pub async fn memberships_for(&self, user_id: Uuid) -> Result<Vec<Membership>> {
        Ok(self.backend.memberships_for_user(user_id).await?)
    }

    /// The conversation shared by two participants, if one exists.
    ///
    /// Intersects both membership sets. The data model allows at most one
    /// shared conversation, but a creation race can leave more; the
    /// smallest id is picked so repeated calls stay consistent.
    pub async fn shared_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<Uuid>> {
        let mine = self.backend.memberships_for_user(a).await?;
        let theirs: HashSet<Uuid> = self
            .backend
            .memberships_for_user(b)
            .await?
            .into_iter()
            .map(|m| m.conversation_id)
            .collect();

        let mut shared: Vec<Uuid> = mine
            .into_iter()
            .map(|m| m.conversation_id)
            .filter(|id| theirs.contains(id))
            .collect();
        shared.sort();
        shared.dedup();

        if shared.len() > 1 {
            tracing::warn!(
                count = shared.len(),
                "participants share multiple conversations; picking the smallest id"
            );
        }
        Ok(shared.first().copied())
    }

    /// Create a conversation with exactly two membership rows.
    ///
    /// No rollback on a failed membership insert; the error names the
    /// orphaned conversation so the condition is visible to the caller.
    pub async fn create_with_members(&self, a: Uuid, b: Uuid) -> Result<Uuid> {
        let conv = self.backend.insert_conversation().await?;

        for user_id in [a, b] {
            self.backend
                .insert_membership(conv.id, user_id)
                .await
                .map_err(|e| {
                    Error::PartialFailure(format!(
                        "conversation {} created but membership for {} failed: {}",
                        conv.id, user_id, e
                    ))
                })?;
        }
        Ok(conv.id)
    }

    /// The other member of a two-party conversation
    pub async fn other_member(
        &self,
        conversation_id: Uuid,
        local_id: Uuid,
    ) -> Result<Option<Uuid>> {
        let members = self
            .backend
            .memberships_for_conversation(conversation_id)
            .await?;
        Ok(members
            .into_iter()
            .map(|m| m.user_id)
            .find(|id| *id != local_id))
    }

    /// Fetch a participant profile
    pub async fn participant(&self, id: Uuid) -> Result<Option<Participant>> {
        Ok(self.backend.find_profile(id).await?)
    }

    /// Replace a conversation's denormalized last-message pointer
    pub async fn repoint_last_message(
        &self,
        conversation_id: Uuid,
        message_id: Option<Uuid>,
    ) -> Result<()> {
        Ok(self
            .backend
            .set_last_message(conversation_id, message_id)
            .await?)
    }
}
