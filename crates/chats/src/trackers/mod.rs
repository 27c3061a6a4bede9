//! Ephemeral state machines fed by the push channel.

pub mod presence;
pub mod typing;

pub use presence::{PresenceChange, PresenceTracker};
pub use typing::{TypingIndicator, TypingTracker, TypingTransition, DEFAULT_TYPING_WINDOW};
