//! Wire vocabulary for the gigchat realtime protocol.
//!
//! Every websocket text frame carries one JSON envelope of the form
//! `{"event": "<name>", "data": <payload>}`. This crate defines the closed set
//! of envelopes in both directions:
//!
//! - [`Command`]: client to server (join, leave, send, mark read, handshake)
//! - [`ServerEvent`]: server to client (connection lifecycle, messages,
//!   presence, read receipts, notifications)
//!
//! Inbound payloads are validated at the boundary. An envelope with an unknown
//! name, a payload of the wrong shape, or a zero identifier is rejected with a
//! [`ProtocolError`] instead of being handed to the state machines.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
mod envelope;
pub mod errors;
pub mod event;
mod ids;
pub mod message;
mod namespace;

pub use command::{Auth, Command, Handshake, MarkAsRead, SendMessage};
pub use errors::{ProtocolError, Result};
pub use event::{
    MessageDeleted, NotificationPayload, PresenceStatus, PresenceUpdate, ReadReceipt, ServerEvent,
};
pub use ids::{ChatId, MessageId, NotificationId, UserId};
pub use message::{MessageKind, MessagePayload};
pub use namespace::Namespace;
