use std::future::{pending, Future};
use std::sync::Arc;

use chatsync_chats::reconciler::needs_unread_clear;
use chatsync_chats::{
    queries, ChannelEvent, Chat, ChatId, ConversationState, ConversationStore, CreateChatRequest,
    CreateMessageRequest, CreatedChat, EventName, Message, PresenceChange, RequestError,
    SelectOutcome, SyncError, SyncResult, TypingIndicator, TypingSignal, TypingTracker,
    TypingTransition, UnreadClearedHint, UserId,
};
use chatsync_gateway::{codec, ChatApi, EventChannel, Subscription};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use super::command::{Command, Internal, Reply};
use super::notice::{SyncNotice, SyncOperation};

enum Flow {
    Continue,
    Stop,
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

pub(crate) struct Actor {
    api: Arc<dyn ChatApi>,
    channel: Arc<dyn EventChannel>,
    store: ConversationStore,
    typing: TypingTracker,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    state_tx: watch::Sender<Arc<ConversationState>>,
    typing_tx: watch::Sender<TypingIndicator>,
    notices: broadcast::Sender<SyncNotice>,
    subscriptions: Vec<Subscription>,
}

pub(crate) struct ActorParts {
    pub api: Arc<dyn ChatApi>,
    pub channel: Arc<dyn EventChannel>,
    pub store: ConversationStore,
    pub typing: TypingTracker,
    pub commands: mpsc::Receiver<Command>,
    pub state_tx: watch::Sender<Arc<ConversationState>>,
    pub typing_tx: watch::Sender<TypingIndicator>,
    pub notices: broadcast::Sender<SyncNotice>,
}

impl Actor {
    pub(crate) fn new(parts: ActorParts) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let subscriptions = EventName::INBOUND
            .iter()
            .map(|&event| subscribe(parts.channel.as_ref(), event, internal_tx.clone()))
            .collect();

        Self {
            api: parts.api,
            channel: parts.channel,
            store: parts.store,
            typing: parts.typing,
            commands: parts.commands,
            internal_tx,
            internal_rx,
            state_tx: parts.state_tx,
            typing_tx: parts.typing_tx,
            notices: parts.notices,
            subscriptions,
        }
    }

    pub(crate) async fn run(mut self) {
        let user_id = self.store.current_user_id().to_string();
        info!(user_id = %user_id, subscriptions = self.subscriptions.len(), "synchronizer started");

        loop {
            let deadline = self.typing.deadline();
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("all handles dropped");
                        break;
                    };
                    if let Flow::Stop = self.handle_command(command) {
                        break;
                    }
                }
                Some(internal) = self.internal_rx.recv() => self.handle_internal(internal),
                _ = deadline_elapsed(deadline) => {
                    if self.typing.expire(Instant::now()) {
                        self.publish_typing();
                    }
                }
            }
        }

        // Dropping the guards unsubscribes every handler.
        self.subscriptions.clear();
        info!(user_id = %user_id, "synchronizer stopped");
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Refresh { reply } => {
                let api = Arc::clone(&self.api);
                self.spawn_request(async move {
                    let (users, chats) = tokio::join!(api.fetch_all_users(), api.fetch_all_chats());
                    let result = users.and_then(|users| chats.map(|chats| (users, chats)));
                    Internal::Refreshed { result, reply }
                });
            }
            Command::SelectChat { chat_id, reply } => {
                let _ = reply.send(self.select_chat(&chat_id));
            }
            Command::ClearSelection { reply } => {
                let cleared = self.store.clear_selection();
                if cleared {
                    self.typing.set_active_chat(None);
                    self.publish_typing();
                    self.publish_state();
                }
                let _ = reply.send(cleared);
            }
            Command::StartChat { user_id, reply } => self.start_chat(user_id, reply),
            Command::SendMessage {
                chat_id,
                text,
                image,
                reply,
            } => self.send_message(chat_id, text, image, reply),
            Command::NotifyTyping { chat_id, reply } => {
                let _ = reply.send(self.notify_typing(chat_id));
            }
            Command::SignOut { reply } => {
                let user_id = self.store.current_user_id().to_string();
                let result = self
                    .channel
                    .publish(EventName::UserWentOffline, codec::encode_user_id(&user_id))
                    .map_err(SyncError::from);
                let _ = reply.send(result);
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::Event(event) => self.handle_event(event),
            Internal::Refreshed { result, reply } => {
                let outcome = result.map_err(SyncError::from).map(|(users, chats)| {
                    self.store.apply_fetched_users(users);
                    let merge = self.store.apply_fetched_chats(chats);
                    if merge.selection_cleared {
                        self.typing.set_active_chat(None);
                        self.publish_typing();
                    }
                    self.publish_state();
                    merge
                });
                if let Err(error) = &outcome {
                    warn!(%error, "refresh failed");
                }
                let _ = reply.send(outcome);
            }
            Internal::MessagesFetched { chat_id, result } => match result {
                Ok(messages) => {
                    if self.store.apply_fetched_messages(&chat_id, messages).is_ok() {
                        self.publish_state();
                    }
                }
                Err(error) => {
                    // Nobody is looking at a deselected chat's failure.
                    if self.store.current_state().is_selected(&chat_id) {
                        self.notify(SyncOperation::LoadMessages, Some(chat_id), error.into());
                    } else {
                        debug!(chat_id = %chat_id, %error, "stale history failure ignored");
                    }
                }
            },
            Internal::UnreadCleared { clear, result } => match result {
                Ok(()) => {
                    if let Ok(true) = self.store.apply_unread_cleared(&clear) {
                        self.publish_state();
                    }
                }
                Err(error) => {
                    self.notify(SyncOperation::ClearUnread, Some(clear.chat_id), error.into())
                }
            },
            Internal::ChatCreated { result, reply } => {
                let outcome = result
                    .map_err(SyncError::from)
                    .and_then(|chat| self.install_created_chat(chat));
                let _ = reply.send(outcome);
            }
            Internal::MessageStored {
                members,
                result,
                reply,
            } => {
                let outcome = result.map_err(SyncError::from).map(|message| {
                    match codec::encode_message_sent(&message, &members) {
                        Ok(payload) => self.publish(EventName::MessageSent, payload, &message.chat_id),
                        Err(error) => self.notify(
                            SyncOperation::Publish,
                            Some(message.chat_id.clone()),
                            error.into(),
                        ),
                    }
                    // The server echo is deduped; merging now shows it at once.
                    if self.store.apply_inbound_message(message.clone()).is_ok() {
                        self.publish_state();
                    }
                    message
                });
                let _ = reply.send(outcome);
            }
        }
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        trace!(event = event.name().as_str(), chat_id = ?event.chat_id(), "channel event");
        match event {
            ChannelEvent::MessageReceived(message) => {
                let chat_id = message.chat_id.clone();
                if let Ok(merge) = self.store.apply_inbound_message(message) {
                    self.publish_state();
                    if merge.needs_server_clear() {
                        self.clear_unread(&chat_id);
                    }
                }
            }
            ChannelEvent::TypingStarted(signal) => {
                match self.typing.observe(signal, Instant::now()) {
                    TypingTransition::Started => self.publish_typing(),
                    TypingTransition::Refreshed | TypingTransition::Recorded => {}
                    TypingTransition::Ignored => debug!("own typing signal ignored"),
                }
            }
            ChannelEvent::UnreadCleared(hint) => {
                if self.store.apply_read_receipt(&hint) > 0 {
                    self.publish_state();
                }
            }
            ChannelEvent::PresenceSnapshot(ids) => {
                self.apply_presence(PresenceChange::Snapshot(ids));
            }
            ChannelEvent::PresenceIncremental(update) => {
                self.apply_presence(PresenceChange::Incremental(update));
            }
            ChannelEvent::UserWentOffline(user_id) => {
                self.apply_presence(PresenceChange::WentOffline(user_id));
            }
        }
    }

    fn select_chat(&mut self, chat_id: &str) -> SyncResult<SelectOutcome> {
        let outcome = self.store.select_chat(chat_id)?;
        if outcome.changed {
            self.publish_state();
            self.activate_chat(chat_id, outcome.needs_unread_clear);
        }
        Ok(outcome)
    }

    /// Follow-up work for a newly selected chat: reset typing, load the
    /// history and, when the counterpart wrote last, clear the unread count.
    fn activate_chat(&mut self, chat_id: &str, clear_unread: bool) {
        self.typing.set_active_chat(Some(chat_id.to_string()));
        self.publish_typing();
        self.load_messages(chat_id);
        if clear_unread {
            self.clear_unread(chat_id);
        }
    }

    fn load_messages(&self, chat_id: &str) {
        let api = Arc::clone(&self.api);
        let chat_id = chat_id.to_string();
        self.spawn_request(async move {
            let result = api.fetch_messages(&chat_id).await;
            Internal::MessagesFetched { chat_id, result }
        });
    }

    /// First phase of the two-phase clear: broadcast the hint and ask the
    /// server. The local count only drops once the server confirms, and only
    /// by what was unread when the request went out.
    fn clear_unread(&self, chat_id: &str) {
        let state = self.store.current_state();
        let Some(chat) = state.chat(chat_id) else {
            return;
        };
        let Some(clear) = self.store.capture_unread_clear(chat_id) else {
            return;
        };

        let hint = UnreadClearedHint {
            chat_id: chat_id.to_string(),
            members: chat.member_ids(),
            cleared_by: Some(state.current_user_id().to_string()),
        };
        match codec::encode_unread_cleared(&hint) {
            Ok(payload) => self.publish(EventName::UnreadCleared, payload, chat_id),
            Err(error) => self.notify(
                SyncOperation::Publish,
                Some(chat_id.to_string()),
                error.into(),
            ),
        }

        let api = Arc::clone(&self.api);
        self.spawn_request(async move {
            let result = api.clear_unread(&clear.chat_id).await;
            Internal::UnreadCleared { clear, result }
        });
    }

    fn start_chat(&mut self, user_id: UserId, reply: Reply<CreatedChat>) {
        let state = self.store.current_state();
        let me = state.current_user_id().to_string();
        if user_id == me {
            let _ = reply.send(Err(RequestError::rejected("cannot start a chat with yourself").into()));
            return;
        }

        if let Some(existing) = queries::chat_with_user(&state, &user_id) {
            let chat_id = existing.id.clone();
            let outcome = self
                .select_chat(&chat_id)
                .map(|_| CreatedChat::Existing(chat_id));
            let _ = reply.send(outcome);
            return;
        }

        let api = Arc::clone(&self.api);
        let request = CreateChatRequest {
            members: vec![me, user_id],
        };
        self.spawn_request(async move {
            let result = api.create_chat(request).await;
            Internal::ChatCreated { result, reply }
        });
    }

    fn install_created_chat(&mut self, chat: Chat) -> SyncResult<CreatedChat> {
        let previous = self.store.current_state().selected_chat_id().map(str::to_string);
        let created = self.store.apply_created_chat(chat)?;
        self.publish_state();

        let chat_id = created.chat_id().to_string();
        if previous.as_deref() != Some(chat_id.as_str()) {
            let state = self.store.current_state();
            let clear = state
                .chat(&chat_id)
                .is_some_and(|chat| needs_unread_clear(chat, state.current_user_id()));
            self.activate_chat(&chat_id, clear);
        }
        Ok(created)
    }

    fn send_message(
        &mut self,
        chat_id: ChatId,
        text: Option<String>,
        image: Option<String>,
        reply: Reply<Message>,
    ) {
        let state = self.store.current_state();
        let Some(chat) = state.chat(&chat_id) else {
            let _ = reply.send(Err(SyncError::unknown_chat(chat_id)));
            return;
        };

        let request = CreateMessageRequest {
            chat_id: chat_id.clone(),
            sender: state.current_user_id().to_string(),
            text,
            image,
        };
        if let Err(reason) = request.validate() {
            let _ = reply.send(Err(SyncError::malformed(EventName::MessageSent.as_str(), reason)));
            return;
        }

        let members = chat.member_ids();
        let api = Arc::clone(&self.api);
        self.spawn_request(async move {
            let result = api.send_message(request).await;
            Internal::MessageStored {
                members,
                result,
                reply,
            }
        });
    }

    fn notify_typing(&self, chat_id: ChatId) -> SyncResult<()> {
        if self.store.current_state().chat(&chat_id).is_none() {
            return Err(SyncError::unknown_chat(chat_id));
        }
        let signal = TypingSignal::new(chat_id, self.store.current_user_id());
        let payload = codec::encode_typing(&signal)?;
        self.channel.publish(EventName::TypingStarted, payload)?;
        Ok(())
    }

    fn apply_presence(&mut self, change: PresenceChange) {
        if self.store.apply_presence(change) {
            self.publish_state();
        }
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = Internal> + Send + 'static,
    {
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let _ = internal_tx.send(request.await);
        });
    }

    fn publish(&self, event: EventName, payload: Value, chat_id: &str) {
        if let Err(error) = self.channel.publish(event, payload) {
            warn!(event = event.as_str(), chat_id, %error, "publish failed");
            self.notify(SyncOperation::Publish, Some(chat_id.to_string()), error.into());
        }
    }

    fn publish_state(&self) {
        let next = self.store.current_state();
        self.state_tx.send_if_modified(|current| {
            if Arc::ptr_eq(current, &next) {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn publish_typing(&self) {
        let next = self.typing.indicator();
        self.typing_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn notify(&self, operation: SyncOperation, chat_id: Option<ChatId>, error: SyncError) {
        if error.is_silent() {
            debug!(%operation, chat_id = ?chat_id, %error, "absorbed background error");
            return;
        }
        warn!(%operation, chat_id = ?chat_id, %error, "background operation failed");
        // No receivers is fine; notices are best effort.
        let _ = self.notices.send(SyncNotice::new(operation, chat_id, error));
    }
}

/// Register a handler that decodes `event` payloads and forwards them to
/// the actor. Runs on the publisher's thread, so it only enqueues.
fn subscribe(
    channel: &dyn EventChannel,
    event: EventName,
    internal_tx: mpsc::UnboundedSender<Internal>,
) -> Subscription {
    channel.subscribe(
        event,
        Arc::new(move |payload: Value| match codec::decode(event, &payload) {
            Ok(decoded) => {
                let _ = internal_tx.send(Internal::Event(decoded));
            }
            Err(error) => warn!(event = event.as_str(), %error, "malformed event dropped"),
        }),
    )
}
