//! Client
//!
//! Action-based client state machine for the gigchat realtime protocol.
//! Glues the core state (connection, conversations, presence, room
//! membership, notifications) to the wire vocabulary.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and action-based patterns as
//! [`gigchat_core`]. It receives events ([`ClientEvent`]), validates and
//! routes them through pure state, and returns actions ([`ClientAction`]) for
//! the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine for one namespace connection
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//! - [`ChatEvent`]: Local notifications for subscribers
//! - [`SendStatus`]: Outcome of an outbound command
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: Websocket carrying text frames
//! - [`transport::connect`]: Open a websocket to a namespace

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod sender;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientIdentity};
pub use error::ClientError;
pub use event::{ChatEvent, ClientAction, ClientEvent, ClientSnapshot};
pub use gigchat_core::env::Environment;
pub use sender::{DropReason, SendStatus};
