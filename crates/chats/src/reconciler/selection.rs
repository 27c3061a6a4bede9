//! Selection, unread clearing and chat creation rules.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::entities::Chat;
use crate::store::ConversationState;
use crate::types::{ChatId, SyncError, SyncResult, UnreadClearedHint};

/// Result of selecting a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOutcome {
    pub chat_id: ChatId,
    /// The last message came from the counterpart, so a clear request
    /// should go to the server (and a hint onto the channel).
    pub needs_unread_clear: bool,
    pub changed: bool,
}

/// Result of merging a newly created chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedChat {
    Inserted(ChatId),
    /// A chat with the same id or member pair was already known
    Existing(ChatId),
}

impl CreatedChat {
    pub fn chat_id(&self) -> &str {
        match self {
            CreatedChat::Inserted(id) | CreatedChat::Existing(id) => id,
        }
    }
}

/// Whether opening `chat` should trigger a server-side unread clear
pub fn needs_unread_clear(chat: &Chat, current_user_id: &str) -> bool {
    chat.last_message
        .as_ref()
        .is_some_and(|last| !last.is_from(current_user_id))
}

/// Make `chat_id` the selected chat.
///
/// History is only kept for the selected chat, so every other chat's list
/// is dropped here.
pub fn select_chat(state: &mut ConversationState, chat_id: &str) -> SyncResult<SelectOutcome> {
    let Some(chat) = state.chat(chat_id) else {
        return Err(SyncError::unknown_chat(chat_id));
    };

    let needs_unread_clear = needs_unread_clear(chat, state.current_user_id());
    let changed = !state.is_selected(chat_id);

    state.selected_chat = Some(chat_id.to_string());
    state.messages_by_chat.retain(|id, _| id == chat_id);

    Ok(SelectOutcome {
        chat_id: chat_id.to_string(),
        needs_unread_clear,
        changed,
    })
}

/// Deselect; returns whether anything was selected.
pub fn clear_selection(state: &mut ConversationState) -> bool {
    state.messages_by_chat.clear();
    state.selected_chat.take().is_some()
}

/// What a server-side clear covers: the unread messages known when the
/// request was issued.
///
/// Messages that arrive while the request is in flight are not covered and
/// stay unread after the confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadClear {
    pub chat_id: ChatId,
    arrivals: u64,
    through: Option<DateTime<Utc>>,
}

impl UnreadClear {
    /// Capture the scope of a clear for `chat_id` issued now
    pub fn capture(state: &ConversationState, chat_id: &str) -> Option<Self> {
        let chat = state.chat(chat_id)?;
        Some(Self {
            chat_id: chat_id.to_string(),
            arrivals: state.unread_arrivals(chat_id),
            through: chat.last_message.as_ref().map(|last| last.created_at),
        })
    }

    fn covers(&self, created_at: DateTime<Utc>) -> bool {
        self.through.is_some_and(|through| created_at <= through)
    }
}

/// The server confirmed `clear`: drop the count to what arrived after the
/// request was issued and mark the covered counterpart messages read.
/// Idempotent.
pub fn confirm_unread_cleared(
    state: &mut ConversationState,
    clear: &UnreadClear,
) -> SyncResult<bool> {
    let me = state.current_user_id().to_string();
    let arrived_since = state
        .unread_arrivals(&clear.chat_id)
        .saturating_sub(clear.arrivals);
    let remaining = u32::try_from(arrived_since).unwrap_or(u32::MAX);

    let Some(chat) = state.chat_mut(&clear.chat_id) else {
        return Err(SyncError::unknown_chat(clear.chat_id.clone()));
    };

    let mut changed = false;
    if chat.unread_message_count > remaining {
        chat.unread_message_count = remaining;
        changed = true;
    }
    if let Some(last) = chat.last_message.as_mut() {
        if !last.is_from(&me) && !last.read && clear.covers(last.created_at) {
            last.read = true;
            changed = true;
        }
    }

    if let Some(history) = state.messages_by_chat.get_mut(&clear.chat_id) {
        for message in history
            .iter_mut()
            .filter(|m| !m.is_from(&me) && !m.read && clear.covers(m.created_at))
        {
            message.read = true;
            changed = true;
        }
    }

    Ok(changed)
}

/// The counterpart cleared their unread count: our own messages in that
/// chat have been read. Never touches unread counts.
pub fn apply_read_receipt(state: &mut ConversationState, hint: &UnreadClearedHint) -> usize {
    let me = state.current_user_id().to_string();
    let Some(reader) = hint.cleared_by.as_deref() else {
        debug!(chat_id = %hint.chat_id, "unread-cleared hint without reader ignored");
        return 0;
    };
    if reader == me {
        debug!(chat_id = %hint.chat_id, "own unread-cleared hint ignored");
        return 0;
    }

    let Some(chat) = state.chat_mut(&hint.chat_id) else {
        return 0;
    };
    if !chat.has_member(reader) {
        return 0;
    }

    let mut marked = 0;
    if let Some(last) = chat.last_message.as_mut() {
        if last.is_from(&me) && !last.read {
            last.read = true;
            marked += 1;
        }
    }
    if let Some(history) = state.messages_by_chat.get_mut(&hint.chat_id) {
        for message in history.iter_mut().filter(|m| m.is_from(&me) && !m.read) {
            message.read = true;
            marked += 1;
        }
    }
    marked
}

/// Add a chat returned by `createChat` and select it.
///
/// A chat with the same id or member pair is never duplicated; the existing
/// one is selected instead.
pub fn merge_created_chat(state: &mut ConversationState, chat: Chat) -> SyncResult<CreatedChat> {
    chat.validate()
        .map_err(|reason| SyncError::malformed("create-chat", reason))?;
    if !chat.has_member(state.current_user_id()) {
        return Err(SyncError::malformed(
            "create-chat",
            "current user is not a member of the created chat",
        ));
    }

    let pair = chat.member_pair();
    let existing = state
        .chats
        .iter()
        .find(|known| known.id == chat.id || (pair.is_some() && known.member_pair() == pair))
        .map(|known| known.id.clone());

    let created = match existing {
        Some(id) => CreatedChat::Existing(id),
        None => {
            let id = chat.id.clone();
            state.chats.push(chat);
            CreatedChat::Inserted(id)
        }
    };

    select_chat(state, created.chat_id())?;
    Ok(created)
}
