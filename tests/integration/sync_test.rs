//! Conversation sync integration tests
//!
//! End-to-end scenarios over the mock backend: conversation resolution,
//! message send/read/delete flows across two live sessions, and chat
//! list aggregation.

#![allow(dead_code)]

mod chat_list;
mod common;
mod conversations;
mod messages;
