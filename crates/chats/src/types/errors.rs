//! Error types for the synchronizer.

use thiserror::Error;

use super::{ChatId, MessageId};

/// Result type alias for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of a call to the authoritative REST source.
///
/// Surfaced to the caller as-is; nothing retries automatically and the
/// conversation state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Invalid response body: {message}")]
    Decode { message: String },
}

impl RequestError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// 4xx responses and envelope rejections
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Status { status, .. } => (400..500).contains(status),
            Self::Rejected { .. } => true,
            _ => false,
        }
    }
}

/// Main error type for the synchronizer.
///
/// None of these is fatal: malformed, stale and duplicate inputs are absorbed
/// locally, request failures are surfaced for a transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Malformed {event} event: {reason}")]
    MalformedEvent { event: String, reason: String },

    #[error("Stale response for chat {chat_id}")]
    StaleResponse { chat_id: ChatId },

    #[error("Duplicate message {message_id}")]
    DuplicateEvent { message_id: MessageId },

    #[error("Chat not found: {chat_id}")]
    UnknownChat { chat_id: ChatId },

    #[error("Event channel error: {message}")]
    Channel { message: String },

    #[error("Synchronizer is not running")]
    Closed,
}

impl SyncError {
    pub fn malformed(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            event: event.into(),
            reason: reason.into(),
        }
    }

    pub fn stale(chat_id: impl Into<ChatId>) -> Self {
        Self::StaleResponse { chat_id: chat_id.into() }
    }

    pub fn duplicate(message_id: impl Into<MessageId>) -> Self {
        Self::DuplicateEvent {
            message_id: message_id.into(),
        }
    }

    pub fn unknown_chat(chat_id: impl Into<ChatId>) -> Self {
        Self::UnknownChat { chat_id: chat_id.into() }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel { message: message.into() }
    }

    /// Errors that are absorbed without telling the user
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::MalformedEvent { .. } | Self::StaleResponse { .. } | Self::DuplicateEvent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_request_errors() {
        assert!(RequestError::status(404, "missing").is_client_error());
        assert!(RequestError::rejected("nope").is_client_error());
        assert!(!RequestError::status(503, "down").is_client_error());
        assert!(!RequestError::Timeout.is_client_error());
    }

    #[test]
    fn silent_errors_are_not_user_visible() {
        assert!(SyncError::duplicate("m1").is_silent());
        assert!(SyncError::stale("c1").is_silent());
        assert!(SyncError::malformed("typing-started", "missing chatId").is_silent());
        assert!(!SyncError::from(RequestError::Timeout).is_silent());
    }
}
