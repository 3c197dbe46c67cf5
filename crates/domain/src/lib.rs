//! Domain entities and realtime event model for Sidechat
//!
//! This crate defines the data model shared by the backend collaborator
//! and the conversations domain:
//! - Entities: participants, conversations, memberships, messages
//! - The tagged realtime event model consumed by the reconciler

pub mod entities;
pub mod events;

pub use entities::{Attachment, AttachmentKind, Conversation, Membership, Message, Participant};
pub use events::{MessageChange, MessageEvent};
