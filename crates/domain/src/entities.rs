//! Domain entities for the Sidechat messaging core
//!
//! Each entity carries its validation and business rules. Messages are
//! the only entity mutated after creation, and only one-way: a read
//! timestamp and a soft-delete timestamp, each settable once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sidechat_common::{Error, Result};

/// A chat participant as supplied by the identity/profile service.
///
/// Immutable from the core's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Attachment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentKind::Image => write!(f, "image"),
            AttachmentKind::File => write!(f, "file"),
        }
    }
}

/// File attachment descriptor carried by a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub kind: AttachmentKind,
}

/// A two-party conversation.
///
/// Membership is expressed through [`Membership`] rows; `last_message_id`
/// is the denormalized pointer used for list previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub last_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new, empty conversation
    pub fn new() -> Self {
        Conversation {
            id: Uuid::new_v4(),
            last_message_id: None,
            created_at: Utc::now(),
        }
    }
}

impl Default for Conversation {
    #[mutants::skip] // Delegates to Conversation::new()
    fn default() -> Self {
        Self::new()
    }
}

/// Membership row linking a participant to a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a new message to send.
    ///
    /// Whitespace-only content counts as absent; a message must carry
    /// content or an attachment (or both) to be sendable.
    pub fn new(
        conversation_id: Uuid,
        sender_id: Uuid,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Self> {
        let content = content.filter(|c| !c.trim().is_empty());

        if content.is_none() && attachment.is_none() {
            return Err(Error::Validation(
                "Message requires content or an attachment".to_string(),
            ));
        }

        Ok(Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content,
            attachment,
            created_at: Utc::now(),
            read_at: None,
            deleted_at: None,
        })
    }

    /// Whether the message has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the message has been marked read
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Ordering key: creation timestamp ascending, id as tie-break so the
    /// order stays stable and deterministic.
    pub fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }

    /// One-line preview for list rendering, from the given viewer's
    /// perspective.
    pub fn preview_for(&self, viewer_id: Uuid) -> String {
        let prefix = if self.sender_id == viewer_id {
            "You: "
        } else {
            ""
        };

        if let Some(content) = &self.content {
            return format!("{}{}", prefix, content);
        }
        match self.attachment.as_ref().map(|a| a.kind) {
            Some(AttachmentKind::Image) => format!("{}📷 Photo", prefix),
            Some(AttachmentKind::File) => format!("{}📎 File", prefix),
            None => format!("{}New message", prefix),
        }
    }
}
