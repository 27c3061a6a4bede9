//! Time-bounded typing indicator for the active chat.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::entities::TypingSignal;
use crate::types::{ChatId, UserId};

/// How long an indicator stays up without a refresh.
pub const DEFAULT_TYPING_WINDOW: Duration = Duration::from_secs(2);

/// Observable indicator for the active chat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypingIndicator {
    #[default]
    Idle,
    Typing { chat_id: ChatId, sender: UserId },
}

impl TypingIndicator {
    pub fn is_typing(&self) -> bool {
        matches!(self, TypingIndicator::Typing { .. })
    }
}

/// What a signal did to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    /// Signal from the current user
    Ignored,
    /// Stored as last-known for an inactive chat
    Recorded,
    /// Idle -> Typing
    Started,
    /// Typing stays up, deadline re-armed
    Refreshed,
}

#[derive(Debug, Clone)]
struct ArmedIndicator {
    chat_id: ChatId,
    sender: UserId,
    deadline: Instant,
}

/// `Idle -> Typing -> Idle` state machine.
///
/// Only the active chat drives the indicator. The tracker holds the
/// deadline but owns no timer; the caller sleeps until [`deadline`] and then
/// calls [`expire`].
///
/// [`deadline`]: TypingTracker::deadline
/// [`expire`]: TypingTracker::expire
#[derive(Debug, Clone)]
pub struct TypingTracker {
    current_user: UserId,
    window: Duration,
    active_chat: Option<ChatId>,
    armed: Option<ArmedIndicator>,
    last_known: HashMap<ChatId, TypingSignal>,
}

impl TypingTracker {
    pub fn new(current_user: impl Into<UserId>, window: Duration) -> Self {
        Self {
            current_user: current_user.into(),
            window,
            active_chat: None,
            armed: None,
            last_known: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn active_chat(&self) -> Option<&str> {
        self.active_chat.as_deref()
    }

    /// Switch the active chat. Any armed indicator is cancelled, even when
    /// re-selecting the same chat. Returns whether one was cancelled.
    pub fn set_active_chat(&mut self, chat_id: Option<ChatId>) -> bool {
        self.active_chat = chat_id;
        self.armed.take().is_some()
    }

    pub fn observe(&mut self, signal: TypingSignal, now: Instant) -> TypingTransition {
        if signal.sender == self.current_user {
            return TypingTransition::Ignored;
        }

        let is_active = self.active_chat.as_deref() == Some(signal.chat_id.as_str());
        self.last_known.insert(signal.chat_id.clone(), signal.clone());

        if !is_active {
            trace!(chat_id = %signal.chat_id, "typing signal recorded for inactive chat");
            return TypingTransition::Recorded;
        }

        let deadline = now + self.window;
        let transition = match self.armed.as_ref() {
            Some(armed) if armed.deadline > now => TypingTransition::Refreshed,
            _ => TypingTransition::Started,
        };

        self.armed = Some(ArmedIndicator {
            chat_id: signal.chat_id,
            sender: signal.sender,
            deadline,
        });
        transition
    }

    /// Flip back to idle once the deadline has passed. Returns whether the
    /// indicator changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.armed {
            Some(armed) if armed.deadline <= now => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|armed| armed.deadline)
    }

    pub fn indicator(&self) -> TypingIndicator {
        match &self.armed {
            Some(armed) => TypingIndicator::Typing {
                chat_id: armed.chat_id.clone(),
                sender: armed.sender.clone(),
            },
            None => TypingIndicator::Idle,
        }
    }

    pub fn last_known(&self, chat_id: &str) -> Option<&TypingSignal> {
        self.last_known.get(chat_id)
    }
}
