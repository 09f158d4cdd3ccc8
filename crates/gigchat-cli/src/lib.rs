//! Terminal client for gigchat.
//!
//! A thin shell over [`gigchat_app::ConnectionManager`]: a websocket
//! [`WsConnector`], a parser for typed input lines, and plain-text rendering
//! of chat events. All protocol logic lives in the lower crates.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
pub mod input;
pub mod render;

pub use driver::{WsConnector, WsDriver};
pub use input::{Input, InputError};
