//! Driver and connector traits for abstracting socket I/O.
//!
//! The [`Driver`] trait decouples the [`crate::Runtime`] from the transport.
//! Production uses a websocket; tests use an in-process simulated broker.

use std::{future::Future, ops::Sub, time::Duration};

use gigchat_core::env::Environment;
use gigchat_proto::{Command, Handshake, Namespace};

/// Abstracts one namespace socket.
///
/// # Implementations
///
/// - **CLI**: websocket via tokio-tungstenite
/// - **Tests**: simulated broker from `gigchat-harness`
pub trait Driver: Send + 'static {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in tests.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Open the socket and send the handshake as its first frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be established.
    fn open(&mut self, handshake: Handshake) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send a command on the open socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed or the write fails.
    fn send(&mut self, command: Command) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next text frame, or `None` once the socket is closed.
    ///
    /// Must be cancel-safe: the runtime polls it inside `tokio::select!`.
    fn recv(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Close the socket. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;
}

/// Builds drivers for the [`crate::ConnectionManager`].
pub trait Connector: Send + Sync + 'static {
    /// Environment handed to each client.
    type Env: Environment;

    /// Driver produced for each connection.
    type Driver: Driver<Instant = <Self::Env as Environment>::Instant>;

    /// Environment for a new connection.
    fn env(&self) -> Self::Env;

    /// Driver for a new connection to `namespace`. Must not open the socket
    /// yet; the runtime calls [`Driver::open`].
    fn driver(&self, namespace: Namespace) -> Self::Driver;
}
