//! In-process channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chatsync_chats::EventName;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{EventChannel, EventHandler, Subscription};
use crate::error::{ChannelError, ChannelResult};

#[derive(Default)]
struct Registry {
    handlers: RwLock<HashMap<EventName, Vec<(Uuid, EventHandler)>>>,
    /// Publish log, only kept by [`LocalChannel::recording`] channels
    published: Option<Mutex<Vec<(EventName, Value)>>>,
    closed: AtomicBool,
}

impl Registry {
    fn remove(&self, event: EventName, id: Uuid) {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = handlers.get_mut(&event) {
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.is_empty() {
                handlers.remove(&event);
            }
        }
        trace!(event = event.as_str(), %id, "handler unsubscribed");
    }
}

/// Loopback fan-out channel.
///
/// Every publish is delivered synchronously, on the publisher's thread, to
/// every handler subscribed to that event at the time of the call. Clones
/// share the same registry, which lets a test play the server side of the
/// channel while the synchronizer holds another clone.
///
/// [`LocalChannel::recording`] additionally keeps every published payload;
/// the log is unbounded, so it is meant for tests and short sessions.
#[derive(Clone, Default)]
pub struct LocalChannel {
    registry: Arc<Registry>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that keeps a log of every publish
    pub fn recording() -> Self {
        Self {
            registry: Arc::new(Registry {
                published: Some(Mutex::default()),
                ..Registry::default()
            }),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.registry.published.is_some()
    }

    pub fn subscriber_count(&self, event: EventName) -> usize {
        self.registry
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map_or(0, Vec::len)
    }

    /// Every payload published so far, in publish order. Always empty
    /// unless the channel is recording.
    pub fn published(&self) -> Vec<(EventName, Value)> {
        self.registry
            .published
            .as_ref()
            .map(|log| log.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .unwrap_or_default()
    }

    pub fn published_to(&self, event: EventName) -> Vec<Value> {
        self.published()
            .into_iter()
            .filter(|(name, _)| *name == event)
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Refuse further publishes. Existing subscriptions stay registered.
    pub fn close(&self) {
        self.registry.closed.store(true, Ordering::SeqCst);
        debug!("local channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.registry.closed.load(Ordering::SeqCst)
    }
}

impl EventChannel for LocalChannel {
    fn subscribe(&self, event: EventName, handler: EventHandler) -> Subscription {
        let id = Uuid::new_v4();
        self.registry
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push((id, handler));
        trace!(event = event.as_str(), %id, "handler subscribed");

        let registry = Arc::downgrade(&self.registry);
        Subscription::with_id(id, event, move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(event, id);
            }
        })
    }

    fn publish(&self, event: EventName, payload: Value) -> ChannelResult<()> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        if let Some(log) = &self.registry.published {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((event, payload.clone()));
        }

        // Handlers run outside the lock so they may subscribe or publish.
        let handlers: Vec<EventHandler> = self
            .registry
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        trace!(event = event.as_str(), handlers = handlers.len(), "event published");
        for handler in handlers {
            handler(payload.clone());
        }
        Ok(())
    }
}
