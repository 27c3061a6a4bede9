//! Authoritative REST source.
//!
//! Every response is wrapped in an envelope `{ success, message, data }`.
//! Failures are returned as [`RequestError`] and never retried here.

mod client;

use async_trait::async_trait;
use chatsync_chats::{Chat, CreateChatRequest, CreateMessageRequest, Message, RequestError, User};
use serde::Deserialize;

pub use client::HttpChatApi;

/// Result type for REST calls
pub type ApiResult<T> = Result<T, RequestError>;

/// Response envelope used by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn rejection(&self) -> RequestError {
        RequestError::rejected(
            self.message
                .clone()
                .unwrap_or_else(|| "request was not successful".to_string()),
        )
    }

    /// The payload of a successful response
    pub fn into_data(self) -> ApiResult<T> {
        if !self.success {
            return Err(self.rejection());
        }
        self.data
            .ok_or_else(|| RequestError::decode("response is missing its data field"))
    }

    /// Success check for endpoints whose payload is not needed
    pub fn into_success(self) -> ApiResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(self.rejection())
        }
    }
}

/// Operations the synchronizer needs from the server.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_current_user(&self) -> ApiResult<User>;

    async fn fetch_all_users(&self) -> ApiResult<Vec<User>>;

    async fn fetch_all_chats(&self) -> ApiResult<Vec<Chat>>;

    async fn fetch_messages(&self, chat_id: &str) -> ApiResult<Vec<Message>>;

    /// Reset the server-side unread count of `chat_id` for the current user
    async fn clear_unread(&self, chat_id: &str) -> ApiResult<()>;

    async fn create_chat(&self, request: CreateChatRequest) -> ApiResult<Chat>;

    async fn send_message(&self, request: CreateMessageRequest) -> ApiResult<Message>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_without_success_is_rejected() {
        let envelope: ApiEnvelope<Vec<User>> =
            serde_json::from_value(json!({ "success": false, "message": "token expired" }))
                .unwrap();
        assert_eq!(
            envelope.into_data(),
            Err(RequestError::rejected("token expired"))
        );
    }

    #[test]
    fn envelope_without_data_fails_to_decode() {
        let envelope: ApiEnvelope<User> =
            serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(matches!(
            envelope.into_data(),
            Err(RequestError::Decode { .. })
        ));
    }

    #[test]
    fn success_only_envelope() {
        let envelope: ApiEnvelope<serde_json::Value> =
            serde_json::from_value(json!({ "success": true, "message": "cleared" })).unwrap();
        assert_eq!(envelope.into_success(), Ok(()));
    }
}
