//! Merge rules folding channel events and REST responses into a
//! [`ConversationState`](crate::store::ConversationState).
//!
//! Every function here is pure over the state it is given: no I/O, no
//! clocks, no shared references. Each one validates its input before it
//! touches anything, so a rejected input leaves the state as it was.

pub mod fetched;
pub mod inbound;
pub mod selection;

pub use fetched::{merge_fetched_chats, merge_fetched_messages, merge_fetched_users, ChatsMerge};
pub use inbound::{merge_inbound_message, InboundMerge};
pub use selection::{
    apply_read_receipt, clear_selection, confirm_unread_cleared, merge_created_chat,
    needs_unread_clear, select_chat, CreatedChat, SelectOutcome, UnreadClear,
};
