//! Chat list ordering rules.

use crate::entities::Chat;

/// Stable move-to-front: remove the chat from its slot and prepend it,
/// leaving the relative order of every other chat untouched.
///
/// Returns `false` if no chat has that id.
pub fn move_to_front(chats: &mut Vec<Chat>, chat_id: &str) -> bool {
    match chats.iter().position(|chat| chat.id == chat_id) {
        Some(0) => true,
        Some(index) => {
            let chat = chats.remove(index);
            chats.insert(0, chat);
            true
        }
        None => false,
    }
}

/// Most recent `last_message` first; chats without one go last.
/// Ties keep their prior relative order.
pub fn sort_by_recency(chats: &mut [Chat]) {
    chats.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
}
