//! Publish/subscribe event channel.
//!
//! The channel is an external collaborator: delivery is at-least-once and
//! ordering is only guaranteed per sender. Handlers receive the raw JSON
//! payload and must not block; the synchronizer's handlers decode and
//! forward into its own queue.

pub mod codec;
mod local;

use std::fmt;
use std::sync::Arc;

use chatsync_chats::EventName;
use serde_json::Value;
use uuid::Uuid;

pub use local::LocalChannel;

use crate::error::ChannelResult;

/// Callback invoked with the raw payload of a delivered event
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Logical publish/subscribe channel keyed by [`EventName`].
pub trait EventChannel: Send + Sync {
    /// Register `handler` for `event`. The handler stays registered for as
    /// long as the returned guard lives.
    fn subscribe(&self, event: EventName, handler: EventHandler) -> Subscription;

    fn publish(&self, event: EventName, payload: Value) -> ChannelResult<()>;
}

/// Scoped registration of one handler.
///
/// Dropping the guard unsubscribes, so a handler can never outlive the
/// component that installed it.
pub struct Subscription {
    id: Uuid,
    event: EventName,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(event: EventName, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self::with_id(Uuid::new_v4(), event, cancel)
    }

    pub fn with_id(
        id: Uuid,
        event: EventName,
        cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            event,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event(&self) -> EventName {
        self.event
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}
