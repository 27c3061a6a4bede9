//! Merge of responses from the authoritative REST source.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::entities::{Chat, MemberPair, Message, User};
use crate::store::ConversationState;
use crate::types::{ChatId, SyncError, SyncResult};
use crate::utils::sort_by_recency;

/// Summary of a chat list load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatsMerge {
    pub kept: usize,
    pub dropped: usize,
    /// The previously selected chat disappeared and the selection was cleared
    pub selection_cleared: bool,
}

/// Replace the chat list with the authoritative one.
///
/// Duplicates (same id or same member pair) and malformed chats are dropped.
/// A locally known newer `last_message` survives the replacement together
/// with its unread count, since a channel event may have overtaken the
/// response.
pub fn merge_fetched_chats(state: &mut ConversationState, fetched: Vec<Chat>) -> ChatsMerge {
    let me = state.current_user_id().to_string();
    let local_last: HashMap<ChatId, (Message, u32)> = state
        .chats
        .iter()
        .filter_map(|chat| {
            let last = chat.last_message.clone()?;
            Some((chat.id.clone(), (last, chat.unread_message_count)))
        })
        .collect();

    let mut seen_ids: HashSet<ChatId> = HashSet::new();
    let mut seen_pairs: HashSet<MemberPair> = HashSet::new();
    let mut chats = Vec::with_capacity(fetched.len());
    let mut dropped = 0;

    for mut chat in fetched {
        if let Err(reason) = chat.validate() {
            warn!(chat_id = %chat.id, %reason, "dropping malformed chat from response");
            dropped += 1;
            continue;
        }
        if !chat.has_member(&me) {
            warn!(chat_id = %chat.id, "dropping chat the current user is not a member of");
            dropped += 1;
            continue;
        }

        let Some(pair) = chat.member_pair() else {
            dropped += 1;
            continue;
        };
        if !seen_ids.insert(chat.id.clone()) || !seen_pairs.insert(pair) {
            debug!(chat_id = %chat.id, "dropping duplicate chat from response");
            dropped += 1;
            continue;
        }

        if let Some((local, local_unread)) = local_last.get(&chat.id) {
            let local_is_newer = match &chat.last_message {
                Some(remote) => local.created_at > remote.created_at,
                None => true,
            };
            // The response predates what the channel already delivered, so
            // its count has not seen those messages either.
            if local_is_newer {
                chat.last_message = Some(local.clone());
                chat.unread_message_count = *local_unread;
            }
        }

        chats.push(chat);
    }

    sort_by_recency(&mut chats);

    let known: HashSet<&str> = chats.iter().map(|chat| chat.id.as_str()).collect();
    let selection_cleared = match state.selected_chat.as_deref() {
        Some(selected) => !known.contains(selected),
        None => false,
    };
    if selection_cleared {
        debug!("selected chat no longer present after refresh");
        state.selected_chat = None;
    }
    state.messages_by_chat.retain(|chat_id, _| known.contains(chat_id.as_str()));
    state.recent_ids.retain(|chat_id, _| known.contains(chat_id.as_str()));

    let kept = chats.len();
    state.chats = chats;

    ChatsMerge {
        kept,
        dropped,
        selection_cleared,
    }
}

/// Install the message history fetched for `chat_id`.
///
/// The response is discarded if `chat_id` is no longer selected. Messages
/// that reached the history through the channel while the request was in
/// flight are kept; the result is ordered by creation time.
pub fn merge_fetched_messages(
    state: &mut ConversationState,
    chat_id: &str,
    fetched: Vec<Message>,
) -> SyncResult<usize> {
    if !state.is_selected(chat_id) {
        return Err(SyncError::stale(chat_id));
    }

    let mut by_id: HashMap<String, Message> = HashMap::new();
    for message in fetched {
        if message.chat_id != chat_id {
            warn!(chat_id, message_id = %message.id, "dropping message for another chat");
            continue;
        }
        if let Err(reason) = message.validate() {
            warn!(chat_id, message_id = %message.id, %reason, "dropping malformed message");
            continue;
        }
        by_id.insert(message.id.clone(), message);
    }

    // Local copies win only for ids the server did not return.
    for local in state.messages(chat_id) {
        by_id.entry(local.id.clone()).or_insert_with(|| local.clone());
    }

    let mut history: Vec<Message> = by_id.into_values().collect();
    history.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let count = history.len();

    if let Some(newest) = history.last().cloned() {
        if let Some(chat) = state.chat_mut(chat_id) {
            let replace = match &chat.last_message {
                Some(last) => newest.is_newer_or_equal(last),
                None => true,
            };
            if replace {
                chat.last_message = Some(newest);
            }
        }
    }

    state.messages_by_chat.insert(chat_id.to_string(), history);
    Ok(count)
}

/// Replace the user directory.
pub fn merge_fetched_users(state: &mut ConversationState, fetched: Vec<User>) -> usize {
    let mut seen = HashSet::new();
    let users: Vec<User> = fetched
        .into_iter()
        .filter(|user| user.validate().is_ok())
        .filter(|user| seen.insert(user.id.clone()))
        .collect();

    let count = users.len();
    state.users = users;
    count
}
