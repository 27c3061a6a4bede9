use async_trait::async_trait;
use chatsync_chats::{Chat, CreateChatRequest, CreateMessageRequest, Message, RequestError, User};
use chatsync_config::ApiConfig;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{ApiEnvelope, ApiResult, ChatApi};

const CURRENT_USER_PATH: &str = "/api/user/get-logged-user";
const ALL_USERS_PATH: &str = "/api/user/get-all-users";
const ALL_CHATS_PATH: &str = "/api/chat/get-all-chats";
const CREATE_CHAT_PATH: &str = "/api/chat/create-new-chat";
const CLEAR_UNREAD_PATH: &str = "/api/chat/clear-unread-message";
const ALL_MESSAGES_PATH: &str = "/api/message/get-all-messages";
const NEW_MESSAGE_PATH: &str = "/api/message/new-message";

fn request_error(error: reqwest::Error) -> RequestError {
    if error.is_timeout() {
        RequestError::Timeout
    } else if error.is_decode() {
        RequestError::decode(error.to_string())
    } else if let Some(status) = error.status() {
        RequestError::status(status.as_u16(), error.to_string())
    } else {
        RequestError::network(error.to_string())
    }
}

/// [`ChatApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatApi {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(request_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> ApiResult<ApiEnvelope<T>> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            // Error bodies usually still carry the envelope's message.
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or(body);
            let error = RequestError::status(status.as_u16(), message);
            if error.is_client_error() {
                debug!(status = status.as_u16(), %error, "request rejected");
            } else {
                warn!(status = status.as_u16(), %error, "request failed");
            }
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|error| RequestError::decode(error.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!(path, "GET");
        self.execute(self.client.get(self.url(path)))
            .await?
            .into_data()
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        debug!(path, "POST");
        self.execute(self.client.post(self.url(path)).json(body))
            .await?
            .into_data()
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_current_user(&self) -> ApiResult<User> {
        self.get(CURRENT_USER_PATH).await
    }

    async fn fetch_all_users(&self) -> ApiResult<Vec<User>> {
        self.get(ALL_USERS_PATH).await
    }

    async fn fetch_all_chats(&self) -> ApiResult<Vec<Chat>> {
        self.get(ALL_CHATS_PATH).await
    }

    async fn fetch_messages(&self, chat_id: &str) -> ApiResult<Vec<Message>> {
        self.get(&format!("{ALL_MESSAGES_PATH}/{chat_id}")).await
    }

    async fn clear_unread(&self, chat_id: &str) -> ApiResult<()> {
        debug!(path = CLEAR_UNREAD_PATH, chat_id, "POST");
        let request = self
            .client
            .post(self.url(CLEAR_UNREAD_PATH))
            .json(&json!({ "chatId": chat_id }));
        self.execute::<serde_json::Value>(request)
            .await?
            .into_success()
    }

    async fn create_chat(&self, request: CreateChatRequest) -> ApiResult<Chat> {
        self.post(CREATE_CHAT_PATH, &request).await
    }

    async fn send_message(&self, request: CreateMessageRequest) -> ApiResult<Message> {
        self.post(NEW_MESSAGE_PATH, &request).await
    }
}
