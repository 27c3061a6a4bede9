//! Domain entities for the synchronizer.
//!
//! These are the shapes served by the authoritative source and carried on
//! the event channel. They carry no synchronization logic of their own.

pub mod chat;
pub mod message;
pub mod typing;
pub mod user;

pub use chat::{Chat, CreateChatRequest, MemberPair};
pub use message::{CreateMessageRequest, Message};
pub use typing::TypingSignal;
pub use user::User;
