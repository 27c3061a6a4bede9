//! The conversation store: single owner of the synchronized state.
//!
//! Readers get an immutable snapshot from [`ConversationStore::current_state`].
//! Writers go through the apply-operations, each of which runs a reconciler
//! rule on a private copy and publishes the copy with one pointer swap, so a
//! half-applied update can never be observed. A rule that rejects its input
//! leaves the published snapshot untouched.

mod state;

use std::sync::Arc;

use tracing::{debug, warn};

pub use state::{ConversationState, DEFAULT_RECENT_MESSAGE_IDS};

use crate::entities::{Chat, Message, User};
use crate::reconciler::{self, ChatsMerge, CreatedChat, InboundMerge, SelectOutcome, UnreadClear};
use crate::trackers::PresenceChange;
use crate::types::{SyncError, SyncResult, UnreadClearedHint};

/// In-memory authoritative view of the user's conversations.
///
/// The store is not internally synchronized; callers funnel every
/// apply-operation through one owner (see the runtime's synchronizer).
#[derive(Debug, Clone)]
pub struct ConversationStore {
    state: Arc<ConversationState>,
}

impl ConversationStore {
    pub fn new(current_user: User) -> Self {
        Self::with_recent_capacity(current_user, DEFAULT_RECENT_MESSAGE_IDS)
    }

    pub fn with_recent_capacity(current_user: User, recent_capacity: usize) -> Self {
        Self {
            state: Arc::new(ConversationState::with_recent_capacity(
                current_user,
                recent_capacity,
            )),
        }
    }

    /// Immutable snapshot of the current state
    pub fn current_state(&self) -> Arc<ConversationState> {
        Arc::clone(&self.state)
    }

    pub fn current_user_id(&self) -> &str {
        self.state.current_user_id()
    }

    fn apply<T>(&mut self, op: impl FnOnce(&mut ConversationState) -> T) -> T {
        let mut next = ConversationState::clone(&self.state);
        let outcome = op(&mut next);
        self.state = Arc::new(next);
        outcome
    }

    fn try_apply<T>(
        &mut self,
        op: impl FnOnce(&mut ConversationState) -> SyncResult<T>,
    ) -> SyncResult<T> {
        let mut next = ConversationState::clone(&self.state);
        let outcome = op(&mut next)?;
        self.state = Arc::new(next);
        Ok(outcome)
    }

    pub fn apply_fetched_users(&mut self, users: Vec<User>) -> usize {
        let count = self.apply(|state| reconciler::merge_fetched_users(state, users));
        debug!(count, "user directory replaced");
        count
    }

    pub fn apply_fetched_chats(&mut self, chats: Vec<Chat>) -> ChatsMerge {
        let merge = self.apply(|state| reconciler::merge_fetched_chats(state, chats));
        debug!(
            kept = merge.kept,
            dropped = merge.dropped,
            selection_cleared = merge.selection_cleared,
            "chat list replaced"
        );
        merge
    }

    /// Install a fetched history. Stale responses are discarded.
    pub fn apply_fetched_messages(
        &mut self,
        chat_id: &str,
        messages: Vec<Message>,
    ) -> SyncResult<usize> {
        let result =
            self.try_apply(|state| reconciler::merge_fetched_messages(state, chat_id, messages));
        match &result {
            Ok(count) => debug!(chat_id, count, "message history loaded"),
            Err(error) => debug!(chat_id, %error, "message history discarded"),
        }
        result
    }

    pub fn apply_inbound_message(&mut self, message: Message) -> SyncResult<InboundMerge> {
        let chat_id = message.chat_id.clone();
        let result = self.try_apply(|state| reconciler::merge_inbound_message(state, message));
        match &result {
            Ok(merge) => debug!(
                chat_id = %chat_id,
                appended = merge.appended,
                unread = merge.unread_count,
                "inbound message merged"
            ),
            Err(error @ SyncError::MalformedEvent { .. }) => {
                warn!(chat_id = %chat_id, %error, "inbound message dropped")
            }
            Err(error) => debug!(chat_id = %chat_id, %error, "inbound message absorbed"),
        }
        result
    }

    /// Scope of a clear request for `chat_id` issued against the current
    /// state; `None` for an unknown chat.
    pub fn capture_unread_clear(&self, chat_id: &str) -> Option<UnreadClear> {
        UnreadClear::capture(&self.state, chat_id)
    }

    /// Authoritative confirmation that the unread messages covered by
    /// `clear` were cleared.
    pub fn apply_unread_cleared(&mut self, clear: &UnreadClear) -> SyncResult<bool> {
        let result = self.try_apply(|state| reconciler::confirm_unread_cleared(state, clear));
        if let Err(error) = &result {
            debug!(chat_id = %clear.chat_id, %error, "unread clear confirmation ignored");
        }
        result
    }

    pub fn apply_read_receipt(&mut self, hint: &UnreadClearedHint) -> usize {
        if self.state.chat(&hint.chat_id).is_none() {
            return 0;
        }
        self.apply(|state| reconciler::apply_read_receipt(state, hint))
    }

    pub fn apply_presence(&mut self, change: PresenceChange) -> bool {
        self.apply(|state| state.presence.apply(change))
    }

    pub fn select_chat(&mut self, chat_id: &str) -> SyncResult<SelectOutcome> {
        let result = self.try_apply(|state| reconciler::select_chat(state, chat_id));
        if let Err(error) = &result {
            debug!(chat_id, %error, "selection ignored");
        }
        result
    }

    pub fn clear_selection(&mut self) -> bool {
        if self.state.selected_chat_id().is_none() {
            return false;
        }
        self.apply(reconciler::clear_selection)
    }

    pub fn apply_created_chat(&mut self, chat: Chat) -> SyncResult<CreatedChat> {
        let result = self.try_apply(|state| reconciler::merge_created_chat(state, chat));
        if let Err(error) = &result {
            warn!(%error, "created chat rejected");
        }
        result
    }
}
