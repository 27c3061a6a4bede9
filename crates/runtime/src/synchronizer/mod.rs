//! The synchronizer actor.
//!
//! One task owns the [`ConversationStore`] and the typing tracker. Commands
//! from [`SyncHandle`], decoded channel events, completions of REST calls
//! and the typing deadline all funnel into its single loop, so every
//! apply-operation runs to completion before the next begins. Observers read
//! snapshots through `watch` channels and never see a half-applied update.

mod actor;
mod command;
mod notice;

use std::sync::Arc;

use chatsync_chats::{
    ChatId, ChatsMerge, ConversationState, ConversationStore, CreatedChat, EventName, Message,
    SelectOutcome, SyncError, SyncResult, TypingIndicator, TypingTracker, User, UserId,
};
use chatsync_config::SyncConfig;
use chatsync_gateway::{codec, ChatApi, EventChannel};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{info, warn};

use actor::{Actor, ActorParts};
use command::Command;

pub use notice::{SyncNotice, SyncOperation};

/// Cloneable handle to a running synchronizer.
///
/// The actor stops after [`sign_out`](SyncHandle::sign_out) or once every
/// handle is dropped; afterwards every operation returns
/// [`SyncError::Closed`].
#[derive(Clone)]
pub struct SyncHandle {
    current_user: User,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<Arc<ConversationState>>,
    typing: watch::Receiver<TypingIndicator>,
    notices: broadcast::Sender<SyncNotice>,
}

impl SyncHandle {
    /// Identify the current user, start the actor, announce the user on the
    /// channel and load the user directory and chat list.
    pub async fn connect(
        api: Arc<dyn ChatApi>,
        channel: Arc<dyn EventChannel>,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        let current_user = api.fetch_current_user().await?;
        info!(user_id = %current_user.id, "current user identified");

        let store =
            ConversationStore::with_recent_capacity(current_user.clone(), config.recent_message_ids);
        let typing = TypingTracker::new(current_user.id.clone(), config.typing_window());

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(store.current_state());
        let (typing_tx, typing_rx) = watch::channel(TypingIndicator::Idle);
        let (notice_tx, _) = broadcast::channel(config.notice_buffer.max(1));

        let actor = Actor::new(ActorParts {
            api,
            channel: Arc::clone(&channel),
            store,
            typing,
            commands: command_rx,
            state_tx,
            typing_tx,
            notices: notice_tx.clone(),
        });
        tokio::spawn(actor.run());

        for event in [EventName::JoinRoom, EventName::UserLogin] {
            if let Err(error) = channel.publish(event, codec::encode_user_id(&current_user.id)) {
                warn!(event = event.as_str(), %error, "announcement failed");
            }
        }

        let handle = Self {
            current_user,
            commands: command_tx,
            state: state_rx,
            typing: typing_rx,
            notices: notice_tx,
        };
        handle.refresh().await?;
        Ok(handle)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<SyncResult<T>>) -> Command,
    ) -> SyncResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    /// Reload the user directory and the chat list
    pub async fn refresh(&self) -> SyncResult<ChatsMerge> {
        self.request(|reply| Command::Refresh { reply }).await
    }

    /// Open a chat. Its history is loaded in the background and, when the
    /// counterpart wrote last, its unread count is cleared on the server.
    pub async fn select_chat(&self, chat_id: impl Into<ChatId>) -> SyncResult<SelectOutcome> {
        let chat_id = chat_id.into();
        self.request(|reply| Command::SelectChat { chat_id, reply })
            .await
    }

    pub async fn clear_selection(&self) -> SyncResult<bool> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::ClearSelection { reply })
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)
    }

    /// Open the direct chat with `user_id`, creating it when none exists
    pub async fn start_chat(&self, user_id: impl Into<UserId>) -> SyncResult<CreatedChat> {
        let user_id = user_id.into();
        self.request(|reply| Command::StartChat { user_id, reply })
            .await
    }

    /// Store a message through the REST source and announce it on the
    /// channel. At least one of `text` and `image` must be non-empty.
    pub async fn send_message(
        &self,
        chat_id: impl Into<ChatId>,
        text: Option<String>,
        image: Option<String>,
    ) -> SyncResult<Message> {
        let chat_id = chat_id.into();
        self.request(|reply| Command::SendMessage {
            chat_id,
            text,
            image,
            reply,
        })
        .await
    }

    pub async fn send_text(
        &self,
        chat_id: impl Into<ChatId>,
        text: impl Into<String>,
    ) -> SyncResult<Message> {
        self.send_message(chat_id, Some(text.into()), None).await
    }

    /// Tell the counterpart that the current user is typing in `chat_id`
    pub async fn notify_typing(&self, chat_id: impl Into<ChatId>) -> SyncResult<()> {
        let chat_id = chat_id.into();
        self.request(|reply| Command::NotifyTyping { chat_id, reply })
            .await
    }

    /// Announce the user as offline and stop the actor
    pub async fn sign_out(&self) -> SyncResult<()> {
        self.request(|reply| Command::SignOut { reply }).await
    }

    /// Receiver of state snapshots
    pub fn state(&self) -> watch::Receiver<Arc<ConversationState>> {
        self.state.clone()
    }

    /// The latest snapshot
    pub fn snapshot(&self) -> Arc<ConversationState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn typing(&self) -> watch::Receiver<TypingIndicator> {
        self.typing.clone()
    }

    pub fn notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
