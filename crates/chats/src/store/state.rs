use std::collections::{BTreeSet, HashMap};

use crate::entities::{Chat, Message, User};
use crate::trackers::PresenceTracker;
use crate::types::{ChatId, UserId};
use crate::utils::RecentIds;

/// Default size of the per-chat dedupe window
pub const DEFAULT_RECENT_MESSAGE_IDS: usize = 256;

/// Immutable view of the conversation state.
///
/// Snapshots are handed out behind an `Arc`; the reconciler works on a
/// private copy which replaces the published one in a single step.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub(crate) current_user: User,
    pub(crate) users: Vec<User>,
    pub(crate) chats: Vec<Chat>,
    pub(crate) selected_chat: Option<ChatId>,
    pub(crate) messages_by_chat: HashMap<ChatId, Vec<Message>>,
    pub(crate) presence: PresenceTracker,
    pub(crate) recent_ids: HashMap<ChatId, RecentIds>,
    pub(crate) recent_capacity: usize,
    /// Running total of unread increments per chat; never decreases.
    pub(crate) unread_arrivals: HashMap<ChatId, u64>,
}

impl ConversationState {
    pub fn new(current_user: User) -> Self {
        Self::with_recent_capacity(current_user, DEFAULT_RECENT_MESSAGE_IDS)
    }

    pub fn with_recent_capacity(current_user: User, recent_capacity: usize) -> Self {
        Self {
            current_user,
            users: Vec::new(),
            chats: Vec::new(),
            selected_chat: None,
            messages_by_chat: HashMap::new(),
            presence: PresenceTracker::new(),
            recent_ids: HashMap::new(),
            recent_capacity: recent_capacity.max(1),
            unread_arrivals: HashMap::new(),
        }
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub fn current_user_id(&self) -> &str {
        &self.current_user.id
    }

    /// Every known user (the directory used for starting chats)
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Chat list, most recent first
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|chat| chat.id == chat_id)
    }

    pub fn selected_chat_id(&self) -> Option<&str> {
        self.selected_chat.as_deref()
    }

    pub fn selected_chat(&self) -> Option<&Chat> {
        self.selected_chat_id().and_then(|id| self.chat(id))
    }

    pub fn is_selected(&self, chat_id: &str) -> bool {
        self.selected_chat_id() == Some(chat_id)
    }

    /// Loaded message history for a chat; only the selected chat has one.
    pub fn messages(&self, chat_id: &str) -> &[Message] {
        self.messages_by_chat
            .get(chat_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn messages_by_chat(&self) -> &HashMap<ChatId, Vec<Message>> {
        &self.messages_by_chat
    }

    pub fn online_users(&self) -> &BTreeSet<UserId> {
        self.presence.online_users()
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub(crate) fn chat_mut(&mut self, chat_id: &str) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|chat| chat.id == chat_id)
    }

    pub(crate) fn recent_ids_mut(&mut self, chat_id: &str) -> &mut RecentIds {
        let capacity = self.recent_capacity;
        self.recent_ids
            .entry(chat_id.to_string())
            .or_insert_with(|| RecentIds::new(capacity))
    }

    pub(crate) fn unread_arrivals(&self, chat_id: &str) -> u64 {
        self.unread_arrivals.get(chat_id).copied().unwrap_or(0)
    }

    pub(crate) fn has_seen_message(&self, chat_id: &str, message_id: &str) -> bool {
        let in_window = self
            .recent_ids
            .get(chat_id)
            .is_some_and(|recent| recent.contains(message_id));
        let in_history = self
            .messages(chat_id)
            .iter()
            .any(|message| message.id == message_id);
        let is_last = self
            .chat(chat_id)
            .and_then(|chat| chat.last_message.as_ref())
            .is_some_and(|last| last.id == message_id);

        in_window || in_history || is_last
    }
}

/// Equality over the observable state; the dedupe window and arrival
/// counters are bookkeeping.
impl PartialEq for ConversationState {
    fn eq(&self, other: &Self) -> bool {
        self.current_user == other.current_user
            && self.users == other.users
            && self.chats == other.chats
            && self.selected_chat == other.selected_chat
            && self.messages_by_chat == other.messages_by_chat
            && self.presence == other.presence
    }
}
