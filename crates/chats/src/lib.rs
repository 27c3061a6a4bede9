//! # Chatsync Chats Crate
//!
//! This crate holds the conversation state synchronizer core: the state a
//! chat client shows (chat list, selected chat, open history, online users)
//! and the rules that keep it consistent while two independent sources feed
//! it, an authoritative REST source and an unordered at-least-once push
//! channel.
//!
//! ## Architecture
//!
//! - **Entities**: wire-level domain models (User, Chat, Message, TypingSignal)
//! - **Store**: [`ConversationStore`], the single owner of the state, handing
//!   out immutable snapshots
//! - **Reconciler**: pure merge rules applied by the store
//! - **Trackers**: typing and presence state machines
//! - **Queries**: derived values (previews, badges, names) over a snapshot
//! - **Types**: ids, error taxonomy and channel event definitions
//!
//! ## Usage
//!
//! ```rust
//! use chatsync_chats::{Chat, ConversationStore, Message, User};
//! use chrono::Utc;
//!
//! let me = User::new("u1", "ada", "lovelace");
//! let peer = User::new("u2", "alan", "turing");
//!
//! let mut store = ConversationStore::new(me.clone());
//! store.apply_fetched_chats(vec![Chat::new("c1", me, peer)]);
//! store
//!     .apply_inbound_message(Message::text("m1", "c1", "u2", "hi", Utc::now()))
//!     .unwrap();
//!
//! assert_eq!(store.current_state().chats()[0].unread_message_count, 1);
//! ```

pub mod entities;
pub mod queries;
pub mod reconciler;
pub mod store;
pub mod trackers;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use entities::{Chat, CreateChatRequest, CreateMessageRequest, MemberPair, Message, TypingSignal, User};
pub use reconciler::{ChatsMerge, CreatedChat, InboundMerge, SelectOutcome, UnreadClear};
pub use store::{ConversationState, ConversationStore};
pub use trackers::{
    PresenceChange, PresenceTracker, TypingIndicator, TypingTracker, TypingTransition,
    DEFAULT_TYPING_WINDOW,
};
pub use types::{
    ChannelEvent, ChatId, EventName, MessageId, PresenceUpdate, RequestError, SyncError,
    SyncResult, UnreadClearedHint, UserId,
};
