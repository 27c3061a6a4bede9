//! Error types for the gateway layer

use chatsync_chats::{EventName, SyncError};
use thiserror::Error;

/// Event channel error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Channel is closed")]
    Closed,

    #[error("Failed to encode {event} payload: {message}")]
    Encode { event: String, message: String },

    #[error("Publish of {event} rejected: {message}")]
    Rejected { event: String, message: String },
}

impl ChannelError {
    pub fn encode(event: EventName, message: impl Into<String>) -> Self {
        Self::Encode {
            event: event.as_str().to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(event: EventName, message: impl Into<String>) -> Self {
        Self::Rejected {
            event: event.as_str().to_string(),
            message: message.into(),
        }
    }
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

impl From<ChannelError> for SyncError {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::Closed => SyncError::channel("channel is closed"),
            other => SyncError::channel(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_sync_error() {
        let error: SyncError = ChannelError::encode(EventName::TypingStarted, "bad").into();
        assert_eq!(
            error,
            SyncError::channel("Failed to encode typing-started payload: bad")
        );
    }
}
