//! Application layer for gigchat
//!
//! Async orchestration around the Sans-IO [`gigchat_client::Client`]. The same
//! runtime code runs in production (websocket driver) and in tests (simulated
//! broker under paused tokio time).
//!
//! # Components
//!
//! - [`Driver`]: Trait for socket I/O
//! - [`Connector`]: Builds a driver for a namespace
//! - [`Runtime`]: Single-task event loop owning all client state
//! - [`ConnectionManager`]: Shared, reference-counted connection context
//! - [`Lease`]: One consumer's hold on a connection
//! - [`Subscription`]: Event listener that unregisters on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
mod manager;
mod runtime;
mod subscription;
mod system_env;

pub use driver::{Connector, Driver};
pub use error::RuntimeError;
pub use manager::{ConnectionManager, Lease};
pub use runtime::{Runtime, RuntimeConfig, RuntimeHandle};
pub use subscription::Subscription;
pub use system_env::SystemEnv;
