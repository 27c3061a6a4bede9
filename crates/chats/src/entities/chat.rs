use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::user::User;
use crate::types::{ChatId, UserId};

/// A direct-message conversation between exactly two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id", alias = "id")]
    pub id: ChatId,
    pub members: Vec<User>,
    /// Most recent message known for this chat (denormalized for list display)
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_message_count: u32,
}

/// Unordered pair of member ids identifying a direct chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberPair(UserId, UserId);

impl MemberPair {
    pub fn new(a: impl Into<UserId>, b: impl Into<UserId>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.0 == user_id || self.1 == user_id
    }
}

/// Request to create a new direct chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub members: Vec<UserId>,
}

impl Chat {
    pub fn new(id: impl Into<ChatId>, first: User, second: User) -> Self {
        Self {
            id: id.into(),
            members: vec![first, second],
            last_message: None,
            unread_message_count: 0,
        }
    }

    pub fn with_last_message(mut self, message: Message) -> Self {
        self.last_message = Some(message);
        self
    }

    pub fn with_unread(mut self, count: u32) -> Self {
        self.unread_message_count = count;
        self
    }

    /// The member pair, if the chat has exactly two members
    pub fn member_pair(&self) -> Option<MemberPair> {
        match self.members.as_slice() {
            [first, second] => Some(MemberPair::new(first.id.clone(), second.id.clone())),
            _ => None,
        }
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|member| member.id.clone()).collect()
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member.id == user_id)
    }

    /// The other participant from `user_id`'s point of view
    pub fn counterpart(&self, user_id: &str) -> Option<&User> {
        self.members.iter().find(|member| member.id != user_id)
    }

    /// Timestamp used to order the chat list
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|message| message.created_at)
    }

    /// Validate chat data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Chat id cannot be empty".to_string());
        }

        match self.members.as_slice() {
            [first, second] if first.id != second.id => {}
            [_, _] => return Err("Direct chat members must be distinct".to_string()),
            _ => {
                return Err(format!(
                    "Direct chat must have exactly two members, found {}",
                    self.members.len()
                ))
            }
        }

        if let Some(last) = &self.last_message {
            if last.chat_id != self.id {
                return Err("Last message belongs to a different chat".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_pair_is_unordered() {
        assert_eq!(MemberPair::new("a", "b"), MemberPair::new("b", "a"));
    }

    #[test]
    fn deserializes_populated_chat() {
        let chat: Chat = serde_json::from_value(json!({
            "_id": "c1",
            "members": [
                { "_id": "u1", "firstname": "ada", "lastname": "lovelace" },
                { "_id": "u2", "firstname": "alan", "lastname": "turing" }
            ],
            "lastMessage": {
                "_id": "m1",
                "chatId": "c1",
                "sender": "u2",
                "text": "hi",
                "createdAt": "2024-05-01T10:00:00Z"
            },
            "unreadMessageCount": 3
        }))
        .unwrap();

        assert_eq!(chat.unread_message_count, 3);
        assert_eq!(chat.counterpart("u1").map(|u| u.id.as_str()), Some("u2"));
        assert!(chat.validate().is_ok());
    }

    #[test]
    fn validate_rejects_group_shapes() {
        let mut chat = Chat::new("c1", User::new("u1", "a", "b"), User::new("u1", "a", "b"));
        assert!(chat.validate().is_err());

        chat.members.push(User::new("u3", "c", "d"));
        assert!(chat.validate().is_err());
    }
}
