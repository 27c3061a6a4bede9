use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{ChatId, MessageId, UserId};

/// A message within a direct chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id", alias = "id")]
    pub id: MessageId,
    /// Chat this message belongs to
    pub chat_id: ChatId,
    /// User who sent the message
    pub sender: UserId,
    /// Text body; absent for image-only messages
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Image payload; absent for text-only messages
    #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Request to send a new message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub chat_id: ChatId,
    pub sender: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The wire uses empty strings for "no text" / "no image".
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl Message {
    pub fn text(
        id: impl Into<MessageId>,
        chat_id: impl Into<ChatId>,
        sender: impl Into<UserId>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender: sender.into(),
            text: Some(text.into()),
            image: None,
            created_at,
            read: false,
        }
    }

    pub fn image(
        id: impl Into<MessageId>,
        chat_id: impl Into<ChatId>,
        sender: impl Into<UserId>,
        image: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            sender: sender.into(),
            text: None,
            image: Some(image.into()),
            created_at,
            read: false,
        }
    }

    /// Check if the message carries an image
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|image| !image.is_empty())
    }

    /// Check if the message carries text
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.is_empty())
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender == user_id
    }

    /// Whether `self` is at least as recent as `other`.
    pub fn is_newer_or_equal(&self, other: &Message) -> bool {
        self.created_at >= other.created_at
    }

    /// Validate message data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Message id cannot be empty".to_string());
        }

        if self.chat_id.trim().is_empty() {
            return Err("Message chat id cannot be empty".to_string());
        }

        if self.sender.trim().is_empty() {
            return Err("Message sender cannot be empty".to_string());
        }

        if !self.has_text() && !self.has_image() {
            return Err("Message must carry text or an image".to_string());
        }

        Ok(())
    }
}

impl CreateMessageRequest {
    pub fn validate(&self) -> Result<(), String> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_image = self.image.as_deref().is_some_and(|i| !i.is_empty());

        if !has_text && !has_image {
            return Err("Message must carry text or an image".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_shape_with_empty_image() {
        let message: Message = serde_json::from_value(json!({
            "_id": "m1",
            "chatId": "c1",
            "sender": "u2",
            "text": "hello",
            "image": "",
            "createdAt": "2024-05-01T10:00:00Z",
            "read": false
        }))
        .unwrap();

        assert_eq!(message.id, "m1");
        assert_eq!(message.text.as_deref(), Some("hello"));
        assert!(message.image.is_none());
        assert!(message.validate().is_ok());
    }

    #[test]
    fn rejects_message_without_text_or_image() {
        let message: Message = serde_json::from_value(json!({
            "_id": "m1",
            "chatId": "c1",
            "sender": "u2",
            "text": "",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert!(message.validate().is_err());
    }

    #[test]
    fn create_request_requires_some_content() {
        let request = CreateMessageRequest {
            chat_id: "c1".into(),
            sender: "u1".into(),
            text: Some("   ".into()),
            image: None,
        };
        assert!(request.validate().is_err());

        let request = CreateMessageRequest {
            image: Some("data:image/png;base64,AAAA".into()),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
