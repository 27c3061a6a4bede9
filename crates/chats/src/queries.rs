//! Derived values computed from a snapshot.
//!
//! These are what a chat list or header shows (previews, badges, names)
//! expressed as plain functions so they can be tested without a renderer.

use chrono::{DateTime, Utc};

use crate::entities::{Chat, User};
use crate::store::ConversationState;

/// Characters of message text shown in the chat list
pub const PREVIEW_LENGTH: usize = 25;

/// The other participant of `chat` from the current user's point of view
pub fn counterpart<'a>(state: &ConversationState, chat: &'a Chat) -> Option<&'a User> {
    chat.counterpart(state.current_user_id())
}

/// One-line preview of the chat's last message.
///
/// Own messages are prefixed with `"You: "`; image-only messages read
/// `"[image]"`.
pub fn last_message_preview(state: &ConversationState, chat: &Chat) -> String {
    let Some(last) = &chat.last_message else {
        return String::new();
    };

    let prefix = if last.is_from(state.current_user_id()) {
        "You: "
    } else {
        ""
    };

    let body = match last.text.as_deref().filter(|text| !text.is_empty()) {
        Some(text) => text.chars().take(PREVIEW_LENGTH).collect::<String>(),
        None if last.has_image() => "[image]".to_string(),
        None => String::new(),
    };

    format!("{prefix}{body}")
}

pub fn last_message_time(chat: &Chat) -> Option<DateTime<Utc>> {
    chat.last_activity()
}

/// Unread badge value; hidden when zero or when the last message is ours.
pub fn unread_badge(state: &ConversationState, chat: &Chat) -> Option<u32> {
    if chat.unread_message_count == 0 {
        return None;
    }
    match &chat.last_message {
        Some(last) if last.is_from(state.current_user_id()) => None,
        _ => Some(chat.unread_message_count),
    }
}

pub fn total_unread(state: &ConversationState) -> u32 {
    state
        .chats()
        .iter()
        .filter_map(|chat| unread_badge(state, chat))
        .fold(0u32, |acc, count| acc.saturating_add(count))
}

/// The direct chat between the current user and `user_id`
pub fn chat_with_user<'a>(state: &'a ConversationState, user_id: &str) -> Option<&'a Chat> {
    let me = state.current_user_id();
    state
        .chats()
        .iter()
        .find(|chat| chat.has_member(me) && chat.has_member(user_id) && user_id != me)
}

pub fn has_chat_with(state: &ConversationState, user_id: &str) -> bool {
    chat_with_user(state, user_id).is_some()
}

pub fn is_online(state: &ConversationState, user_id: &str) -> bool {
    state.presence().is_online(user_id)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// "ada", "LOVELACE" -> "Ada Lovelace"
pub fn display_name(user: &User) -> String {
    let first = capitalize(user.first_name.trim());
    let last = capitalize(user.last_name.trim());
    match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{first} {last}"),
        (false, true) => first,
        (true, false) => last,
        (true, true) => String::new(),
    }
}

/// "ada", "lovelace" -> "AL"
pub fn initials(user: &User) -> String {
    [user.first_name.trim(), user.last_name.trim()]
        .iter()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Users whose first or last name contains `key` (case-insensitive),
/// excluding the current user.
pub fn search_users<'a>(state: &'a ConversationState, key: &str) -> Vec<&'a User> {
    let key = key.trim().to_lowercase();
    let me = state.current_user_id();
    state
        .users()
        .iter()
        .filter(|user| user.id != me)
        .filter(|user| {
            user.first_name.to_lowercase().contains(&key)
                || user.last_name.to_lowercase().contains(&key)
        })
        .collect()
}
