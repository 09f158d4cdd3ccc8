//! Core state for the gigchat realtime client.
//!
//! Pure state machines with no I/O. Each one consumes validated protocol
//! events or user intents and either mutates local state or returns the
//! commands the caller must put on the wire.
//!
//! # Components
//!
//! - [`connection::Connection`]: handshake lifecycle of one namespace socket
//! - [`ChatStore`]: conversations, message lists, previews, unread counters
//! - [`PresenceTracker`]: online set and per-participant last-seen
//! - [`RoomMembership`]: which conversation the socket is joined to
//! - [`NotificationFeed`]: user-scoped notifications
//! - [`env::Environment`]: time abstraction for deterministic tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chat;
pub mod connection;
pub mod env;
pub mod error;
mod notification;
mod presence;
mod room;

pub use chat::{Chat, ChatStore, Message, MessagePreview};
pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use error::ConnectionError;
pub use notification::{DEFAULT_FEED_CAPACITY, Notification, NotificationFeed};
pub use presence::{PresenceEntry, PresenceTracker, RosterDiff};
pub use room::RoomMembership;
