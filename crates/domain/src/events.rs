//! Realtime event model
//!
//! The transport reports raw row changes ([`MessageChange`]) carrying the
//! full new row, at-least-once and without ordering guarantees across
//! subscriptions. The reconciler never inspects ad hoc field presence;
//! changes are classified once into the tagged [`MessageEvent`] and
//! handlers dispatch on the tag.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::Message;

/// Raw row change as delivered by the realtime transport
#[derive(Debug, Clone, PartialEq)]
pub enum MessageChange {
    /// A message row was inserted
    Inserted(Message),
    /// A message row was updated; carries the full new row
    Updated(Message),
}

impl MessageChange {
    /// Conversation the changed row belongs to
    pub fn conversation_id(&self) -> Uuid {
        match self {
            MessageChange::Inserted(m) | MessageChange::Updated(m) => m.conversation_id,
        }
    }
}

/// Tagged message event consumed by the reconciler and the chat list
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEvent {
    /// A message was inserted (may already be soft-deleted; handlers
    /// must ignore those)
    Inserted(Message),
    /// A message was marked read
    MarkedRead {
        conversation_id: Uuid,
        message_id: Uuid,
        read_at: DateTime<Utc>,
    },
    /// A message was soft-deleted
    SoftDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
        deleted_at: DateTime<Utc>,
    },
}

impl MessageEvent {
    /// Classify a raw row change into a tagged event.
    ///
    /// An update carrying both timestamps classifies as a soft delete: a
    /// deleted message must never resurface. Updates carrying neither
    /// timestamp have no meaning for this core and yield `None`.
    pub fn classify(change: MessageChange) -> Option<MessageEvent> {
        match change {
            MessageChange::Inserted(m) => Some(MessageEvent::Inserted(m)),
            MessageChange::Updated(m) => {
                if let Some(deleted_at) = m.deleted_at {
                    Some(MessageEvent::SoftDeleted {
                        conversation_id: m.conversation_id,
                        message_id: m.id,
                        deleted_at,
                    })
                } else {
                    m.read_at.map(|read_at| MessageEvent::MarkedRead {
                        conversation_id: m.conversation_id,
                        message_id: m.id,
                        read_at,
                    })
                }
            }
        }
    }

    /// Conversation the event is scoped to
    pub fn conversation_id(&self) -> Uuid {
        match self {
            MessageEvent::Inserted(m) => m.conversation_id,
            MessageEvent::MarkedRead {
                conversation_id, ..
            }
            | MessageEvent::SoftDeleted {
                conversation_id, ..
            } => *conversation_id,
        }
    }
}
