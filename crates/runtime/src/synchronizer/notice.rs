use std::fmt;

use chatsync_chats::{ChatId, SyncError};

/// Background work whose failure is reported as a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    LoadMessages,
    ClearUnread,
    Publish,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncOperation::LoadMessages => "load messages",
            SyncOperation::ClearUnread => "clear unread messages",
            SyncOperation::Publish => "publish event",
        };
        f.write_str(name)
    }
}

/// Transient failure of work nobody is awaiting, for a toast-style
/// notification. The state was left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncNotice {
    pub operation: SyncOperation,
    pub chat_id: Option<ChatId>,
    pub error: SyncError,
}

impl SyncNotice {
    pub fn new(operation: SyncOperation, chat_id: Option<ChatId>, error: SyncError) -> Self {
        Self {
            operation,
            chat_id,
            error,
        }
    }
}

impl fmt::Display for SyncNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {}: {}", self.operation, self.error)
    }
}
