//! Shared error handling for Sidechat
//!
//! This crate provides the common error taxonomy used across the
//! Sidechat messaging client core.

pub mod error;

pub use error::{Error, Result};
