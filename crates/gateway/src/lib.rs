//! # Chatsync Gateway Crate
//!
//! This crate connects the synchronizer to its two outside sources: the
//! publish/subscribe event channel and the authoritative REST API.
//!
//! ## Architecture
//!
//! - **Channel**: the [`EventChannel`] seam, scoped [`Subscription`] guards
//!   and [`LocalChannel`], an in-process fan-out implementation
//! - **Codec**: translation between raw JSON payloads and typed
//!   [`ChannelEvent`](chatsync_chats::ChannelEvent)s
//! - **REST**: the [`ChatApi`] seam and its reqwest-backed [`HttpChatApi`]
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use chatsync_chats::EventName;
//! use chatsync_gateway::{EventChannel, LocalChannel};
//! use serde_json::json;
//!
//! let channel = LocalChannel::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = Arc::clone(&seen);
//! let subscription = channel.subscribe(
//!     EventName::UserWentOffline,
//!     Arc::new(move |payload| sink.lock().unwrap().push(payload)),
//! );
//!
//! channel.publish(EventName::UserWentOffline, json!("u2")).unwrap();
//! drop(subscription);
//! channel.publish(EventName::UserWentOffline, json!("u3")).unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![json!("u2")]);
//! ```

pub mod channel;
pub mod error;
pub mod rest;

pub use channel::codec;
pub use channel::{EventChannel, EventHandler, LocalChannel, Subscription};
pub use error::{ChannelError, ChannelResult};
pub use rest::{ApiEnvelope, ApiResult, ChatApi, HttpChatApi};
