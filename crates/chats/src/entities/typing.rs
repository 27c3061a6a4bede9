use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChatId, UserId};

/// Ephemeral "user is typing" signal. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub chat_id: ChatId,
    pub sender: UserId,
    #[serde(default = "Utc::now", alias = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

impl TypingSignal {
    pub fn new(chat_id: impl Into<ChatId>, sender: impl Into<UserId>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender: sender.into(),
            sent_at: Utc::now(),
        }
    }
}
