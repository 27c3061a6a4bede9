//! Shared types and interfaces for the synchronizer.
//!
//! This module contains the identifier aliases, error taxonomy and channel
//! event definitions used across the crate and by its collaborators.

pub mod errors;
pub mod events;

// Re-export common types
pub use errors::{RequestError, SyncError, SyncResult};
pub use events::{ChannelEvent, EventName, PresenceUpdate, UnreadClearedHint};

// Common type aliases
pub type ChatId = String;
pub type MessageId = String;
pub type UserId = String;
