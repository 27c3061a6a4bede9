//! Event types carried on the push channel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ChatId, UserId};
use crate::entities::{Message, TypingSignal};

/// Logical event names on the publish/subscribe channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    MessageSent,
    MessageReceived,
    TypingStarted,
    UnreadCleared,
    PresenceSnapshot,
    PresenceIncremental,
    UserWentOffline,
    JoinRoom,
    UserLogin,
}

impl EventName {
    /// Events the synchronizer listens to
    pub const INBOUND: [EventName; 6] = [
        EventName::MessageReceived,
        EventName::TypingStarted,
        EventName::UnreadCleared,
        EventName::PresenceSnapshot,
        EventName::PresenceIncremental,
        EventName::UserWentOffline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::MessageSent => "message-sent",
            EventName::MessageReceived => "message-received",
            EventName::TypingStarted => "typing-started",
            EventName::UnreadCleared => "unread-cleared",
            EventName::PresenceSnapshot => "presence-snapshot",
            EventName::PresenceIncremental => "presence-incremental",
            EventName::UserWentOffline => "user-went-offline",
            EventName::JoinRoom => "join-room",
            EventName::UserLogin => "user-login",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message-sent" => Ok(EventName::MessageSent),
            "message-received" => Ok(EventName::MessageReceived),
            "typing-started" => Ok(EventName::TypingStarted),
            "unread-cleared" => Ok(EventName::UnreadCleared),
            "presence-snapshot" => Ok(EventName::PresenceSnapshot),
            "presence-incremental" => Ok(EventName::PresenceIncremental),
            "user-went-offline" => Ok(EventName::UserWentOffline),
            "join-room" => Ok(EventName::JoinRoom),
            "user-login" => Ok(EventName::UserLogin),
            other => Err(format!("unknown event name: {other}")),
        }
    }
}

/// Incremental presence change: users that came online and went offline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(default)]
    pub online: Vec<UserId>,
    #[serde(default)]
    pub offline: Vec<UserId>,
}

impl PresenceUpdate {
    pub fn came_online(ids: impl IntoIterator<Item = impl Into<UserId>>) -> Self {
        Self {
            online: ids.into_iter().map(Into::into).collect(),
            offline: Vec::new(),
        }
    }

    pub fn went_offline(ids: impl IntoIterator<Item = impl Into<UserId>>) -> Self {
        Self {
            online: Vec::new(),
            offline: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Broadcast after a clear request is issued. A hint only: it never
/// changes unread counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadClearedHint {
    pub chat_id: ChatId,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared_by: Option<UserId>,
}

/// Decoded inbound channel event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    MessageReceived(Message),
    TypingStarted(TypingSignal),
    UnreadCleared(UnreadClearedHint),
    PresenceSnapshot(Vec<UserId>),
    PresenceIncremental(PresenceUpdate),
    UserWentOffline(UserId),
}

impl ChannelEvent {
    /// Get the chat ID associated with this event
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            ChannelEvent::MessageReceived(message) => Some(&message.chat_id),
            ChannelEvent::TypingStarted(signal) => Some(&signal.chat_id),
            ChannelEvent::UnreadCleared(hint) => Some(&hint.chat_id),
            ChannelEvent::PresenceSnapshot(_)
            | ChannelEvent::PresenceIncremental(_)
            | ChannelEvent::UserWentOffline(_) => None,
        }
    }

    pub fn name(&self) -> EventName {
        match self {
            ChannelEvent::MessageReceived(_) => EventName::MessageReceived,
            ChannelEvent::TypingStarted(_) => EventName::TypingStarted,
            ChannelEvent::UnreadCleared(_) => EventName::UnreadCleared,
            ChannelEvent::PresenceSnapshot(_) => EventName::PresenceSnapshot,
            ChannelEvent::PresenceIncremental(_) => EventName::PresenceIncremental,
            ChannelEvent::UserWentOffline(_) => EventName::UserWentOffline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_round_trip_through_strings() {
        for name in EventName::INBOUND {
            assert_eq!(name.as_str().parse::<EventName>().unwrap(), name);
        }
        assert!("receive-message".parse::<EventName>().is_err());
    }

    #[test]
    fn events_report_their_name_and_chat() {
        let hint = ChannelEvent::UnreadCleared(UnreadClearedHint {
            chat_id: "c1".into(),
            members: vec!["u1".into(), "u2".into()],
            cleared_by: None,
        });
        assert_eq!(hint.name(), EventName::UnreadCleared);
        assert_eq!(hint.chat_id(), Some("c1"));

        let offline = ChannelEvent::UserWentOffline("u2".into());
        assert_eq!(offline.name(), EventName::UserWentOffline);
        assert_eq!(offline.chat_id(), None);
    }

    #[test]
    fn serde_names_match_wire_names() {
        let encoded = serde_json::to_value(EventName::PresenceIncremental).unwrap();
        assert_eq!(encoded, serde_json::json!("presence-incremental"));
    }
}
