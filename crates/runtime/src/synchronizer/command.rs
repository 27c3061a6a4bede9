use chatsync_chats::{
    ChannelEvent, Chat, ChatId, ChatsMerge, CreatedChat, Message, SelectOutcome, SyncResult,
    UnreadClear, User, UserId,
};
use chatsync_gateway::ApiResult;
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<SyncResult<T>>;

/// Requests from [`SyncHandle`](super::SyncHandle)
pub(crate) enum Command {
    Refresh {
        reply: Reply<ChatsMerge>,
    },
    SelectChat {
        chat_id: ChatId,
        reply: Reply<SelectOutcome>,
    },
    ClearSelection {
        reply: oneshot::Sender<bool>,
    },
    StartChat {
        user_id: UserId,
        reply: Reply<CreatedChat>,
    },
    SendMessage {
        chat_id: ChatId,
        text: Option<String>,
        image: Option<String>,
        reply: Reply<Message>,
    },
    NotifyTyping {
        chat_id: ChatId,
        reply: Reply<()>,
    },
    SignOut {
        reply: Reply<()>,
    },
}

/// Inputs produced inside the synchronizer: decoded channel events and
/// completions of spawned REST calls.
pub(crate) enum Internal {
    Event(ChannelEvent),
    Refreshed {
        result: ApiResult<(Vec<User>, Vec<Chat>)>,
        reply: Reply<ChatsMerge>,
    },
    MessagesFetched {
        chat_id: ChatId,
        result: ApiResult<Vec<Message>>,
    },
    UnreadCleared {
        clear: UnreadClear,
        result: ApiResult<()>,
    },
    ChatCreated {
        result: ApiResult<Chat>,
        reply: Reply<CreatedChat>,
    },
    MessageStored {
        members: Vec<UserId>,
        result: ApiResult<Message>,
        reply: Reply<Message>,
    },
}
