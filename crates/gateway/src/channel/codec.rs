//! Wire codec for channel payloads.
//!
//! Inbound payloads are untrusted: anything missing a required field comes
//! back as [`SyncError::MalformedEvent`] and is dropped by the caller.

use chatsync_chats::{
    ChannelEvent, EventName, Message, PresenceUpdate, SyncError, SyncResult, TypingSignal,
    UnreadClearedHint, UserId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ChannelError, ChannelResult};

fn parse<T: DeserializeOwned>(event: EventName, payload: &Value) -> SyncResult<T> {
    T::deserialize(payload).map_err(|error| SyncError::malformed(event.as_str(), error.to_string()))
}

fn user_ids(event: EventName, values: &[Value]) -> SyncResult<Vec<UserId>> {
    values
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| SyncError::malformed(event.as_str(), "user id must be a string"))
        })
        .collect()
}

/// Decode one inbound payload.
///
/// Presence payloads are accepted either as a bare array of user ids (the
/// full online list) or as `{ "online": [...], "offline": [...] }`. A bare
/// array on `presence-incremental` is a full list and decodes as a snapshot.
pub fn decode(event: EventName, payload: &Value) -> SyncResult<ChannelEvent> {
    match event {
        EventName::MessageReceived => parse(event, payload).map(ChannelEvent::MessageReceived),
        EventName::TypingStarted => parse(event, payload).map(ChannelEvent::TypingStarted),
        EventName::UnreadCleared => parse(event, payload).map(ChannelEvent::UnreadCleared),
        EventName::PresenceSnapshot => match payload {
            Value::Array(values) => user_ids(event, values).map(ChannelEvent::PresenceSnapshot),
            Value::Object(_) => {
                let update: PresenceUpdate = parse(event, payload)?;
                Ok(ChannelEvent::PresenceSnapshot(update.online))
            }
            _ => Err(SyncError::malformed(event.as_str(), "expected a list of user ids")),
        },
        EventName::PresenceIncremental => match payload {
            Value::Array(values) => user_ids(event, values).map(ChannelEvent::PresenceSnapshot),
            Value::Object(_) => parse(event, payload).map(ChannelEvent::PresenceIncremental),
            _ => Err(SyncError::malformed(event.as_str(), "expected a presence update")),
        },
        EventName::UserWentOffline => offline_user(payload)
            .map(ChannelEvent::UserWentOffline)
            .ok_or_else(|| SyncError::malformed(event.as_str(), "missing user id")),
        EventName::MessageSent | EventName::JoinRoom | EventName::UserLogin => Err(
            SyncError::malformed(event.as_str(), "event is not delivered to clients"),
        ),
    }
}

fn offline_user(payload: &Value) -> Option<UserId> {
    let id = match payload {
        Value::String(id) => Some(id.as_str()),
        Value::Object(fields) => ["userId", "_id", "id"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str)),
        _ => None,
    };
    id.filter(|id| !id.is_empty()).map(str::to_string)
}

fn encode<T: Serialize>(event: EventName, value: &T) -> ChannelResult<Value> {
    serde_json::to_value(value).map_err(|error| ChannelError::encode(event, error.to_string()))
}

/// `message-sent`: the stored message plus the member ids the server relays to.
pub fn encode_message_sent(message: &Message, members: &[UserId]) -> ChannelResult<Value> {
    let mut payload = encode(EventName::MessageSent, message)?;
    match payload.as_object_mut() {
        Some(fields) => {
            fields.insert("members".to_string(), Value::from(members.to_vec()));
            Ok(payload)
        }
        None => Err(ChannelError::encode(
            EventName::MessageSent,
            "message did not encode as an object",
        )),
    }
}

pub fn encode_typing(signal: &TypingSignal) -> ChannelResult<Value> {
    encode(EventName::TypingStarted, signal)
}

pub fn encode_unread_cleared(hint: &UnreadClearedHint) -> ChannelResult<Value> {
    encode(EventName::UnreadCleared, hint)
}

/// Payload of `user-went-offline`, `join-room` and `user-login`
pub fn encode_user_id(user_id: &str) -> Value {
    Value::String(user_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_message_with_wire_names() {
        let payload = json!({
            "_id": "m1",
            "chatId": "c1",
            "sender": "u2",
            "text": "hi",
            "image": "",
            "createdAt": "2024-05-01T10:00:00Z",
            "read": false,
            "members": ["u1", "u2"]
        });

        match decode(EventName::MessageReceived, &payload).unwrap() {
            ChannelEvent::MessageReceived(message) => {
                assert_eq!(message.id, "m1");
                assert_eq!(message.text.as_deref(), Some("hi"));
                assert!(message.image.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn message_without_id_is_malformed() {
        let payload = json!({ "chatId": "c1", "sender": "u2", "text": "hi" });
        let error = decode(EventName::MessageReceived, &payload).unwrap_err();
        assert!(matches!(error, SyncError::MalformedEvent { ref event, .. } if event == "message-received"));
    }

    #[test]
    fn presence_accepts_list_or_update() {
        assert_eq!(
            decode(EventName::PresenceSnapshot, &json!(["u1", "u2"])).unwrap(),
            ChannelEvent::PresenceSnapshot(vec!["u1".into(), "u2".into()])
        );
        assert_eq!(
            decode(EventName::PresenceIncremental, &json!({ "offline": ["u2"] })).unwrap(),
            ChannelEvent::PresenceIncremental(PresenceUpdate::went_offline(["u2"]))
        );
        assert_eq!(
            decode(EventName::PresenceIncremental, &json!(["u3"])).unwrap(),
            ChannelEvent::PresenceSnapshot(vec!["u3".into()])
        );
        assert!(decode(EventName::PresenceSnapshot, &json!([1, 2])).is_err());
    }

    #[test]
    fn offline_accepts_bare_or_wrapped_id() {
        assert_eq!(
            decode(EventName::UserWentOffline, &json!("u2")).unwrap(),
            ChannelEvent::UserWentOffline("u2".into())
        );
        assert_eq!(
            decode(EventName::UserWentOffline, &json!({ "userId": "u3" })).unwrap(),
            ChannelEvent::UserWentOffline("u3".into())
        );
        assert!(decode(EventName::UserWentOffline, &json!(null)).is_err());
        assert!(decode(EventName::UserWentOffline, &json!("")).is_err());
    }

    #[test]
    fn outbound_only_events_do_not_decode() {
        assert!(decode(EventName::JoinRoom, &json!("u1")).is_err());
    }

    #[test]
    fn message_sent_carries_members() {
        let message = Message::text("m1", "c1", "u1", "hello", chrono::Utc::now());
        let payload = encode_message_sent(&message, &["u1".into(), "u2".into()]).unwrap();

        assert_eq!(payload["_id"], "m1");
        assert_eq!(payload["chatId"], "c1");
        assert_eq!(payload["members"], json!(["u1", "u2"]));
    }

    #[test]
    fn unread_hint_uses_camel_case() {
        let hint = UnreadClearedHint {
            chat_id: "c1".into(),
            members: vec!["u1".into(), "u2".into()],
            cleared_by: Some("u1".into()),
        };
        assert_eq!(
            encode_unread_cleared(&hint).unwrap(),
            json!({ "chatId": "c1", "members": ["u1", "u2"], "clearedBy": "u1" })
        );
    }
}
