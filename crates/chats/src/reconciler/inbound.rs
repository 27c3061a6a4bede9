//! Merge of messages pushed by the event channel.

use tracing::{debug, trace};

use crate::entities::Message;
use crate::store::ConversationState;
use crate::types::{EventName, SyncError, SyncResult};
use crate::utils::move_to_front;

/// Result of folding one inbound message into the state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMerge {
    /// The chat was selected, so the message joined its history
    pub appended: bool,
    /// `last_message` now points at this message
    pub became_last: bool,
    pub unread_count: u32,
    pub from_current_user: bool,
}

impl InboundMerge {
    /// The user is looking at the chat and someone else wrote: the caller
    /// should ask the server to clear the unread count.
    pub fn needs_server_clear(&self) -> bool {
        self.appended && !self.from_current_user
    }
}

/// Fold an inbound message into `state`.
///
/// Only messages from someone else count as unread, and only while their
/// chat is not selected. Nothing is mutated unless the message is accepted;
/// unknown chats, malformed messages and redeliveries come back as errors
/// for the caller to absorb.
pub fn merge_inbound_message(
    state: &mut ConversationState,
    message: Message,
) -> SyncResult<InboundMerge> {
    message
        .validate()
        .map_err(|reason| SyncError::malformed(EventName::MessageReceived.as_str(), reason))?;

    let chat_id = message.chat_id.clone();
    if state.chat(&chat_id).is_none() {
        debug!(chat_id = %chat_id, message_id = %message.id, "message for unknown chat ignored");
        return Err(SyncError::unknown_chat(chat_id));
    }

    if state.has_seen_message(&chat_id, &message.id) {
        trace!(chat_id = %chat_id, message_id = %message.id, "duplicate delivery dropped");
        return Err(SyncError::duplicate(message.id));
    }

    // Read once; every rule below uses this value.
    let is_selected = state.is_selected(&chat_id);
    let from_current_user = message.is_from(state.current_user_id());

    state.recent_ids_mut(&chat_id).insert(message.id.clone());

    if is_selected {
        let history = state.messages_by_chat.entry(chat_id.clone()).or_default();
        let position = history.partition_point(|existing| existing.created_at <= message.created_at);
        history.insert(position, message.clone());
    }

    let Some(chat) = state.chat_mut(&chat_id) else {
        return Err(SyncError::unknown_chat(chat_id));
    };

    let became_last = match &chat.last_message {
        Some(last) => message.is_newer_or_equal(last),
        None => true,
    };
    if became_last {
        chat.last_message = Some(message);
    }

    let counts_as_unread = !is_selected && !from_current_user;
    if counts_as_unread {
        chat.unread_message_count = chat.unread_message_count.saturating_add(1);
    }
    let unread_count = chat.unread_message_count;

    if counts_as_unread {
        *state.unread_arrivals.entry(chat_id.clone()).or_default() += 1;
    }

    move_to_front(&mut state.chats, &chat_id);

    Ok(InboundMerge {
        appended: is_selected,
        became_last,
        unread_count,
        from_current_user,
    })
}
