//! Websocket driver for the shared connection context.

use gigchat_app::{Connector, Driver, SystemEnv};
use gigchat_client::transport::{self, ConnectedClient, TransportError};
use gigchat_proto::{Command, Handshake, Namespace};
use tracing::debug;

/// One namespace socket over tokio-tungstenite.
pub struct WsDriver {
    endpoint: String,
    namespace: Namespace,
    socket: Option<ConnectedClient>,
}

impl WsDriver {
    /// Driver for `namespace` on `endpoint`. Nothing is opened yet.
    pub fn new(endpoint: impl Into<String>, namespace: Namespace) -> Self {
        Self { endpoint: endpoint.into(), namespace, socket: None }
    }
}

impl Driver for WsDriver {
    type Error = TransportError;
    type Instant = std::time::Instant;

    async fn open(&mut self, handshake: Handshake) -> Result<(), Self::Error> {
        // Reopening replaces the previous socket.
        self.socket = None;

        let socket = transport::connect(&self.endpoint, self.namespace).await?;
        let frame = Command::Handshake(handshake).encode()?;
        socket.to_server.send(frame).await.map_err(|_| TransportError::Closed)?;
        debug!(namespace = %self.namespace, "handshake sent");

        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, command: Command) -> Result<(), Self::Error> {
        let socket = self.socket.as_ref().ok_or(TransportError::Closed)?;
        let frame = command.encode()?;
        socket.to_server.send(frame).await.map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<String> {
        self.socket.as_mut()?.from_server.recv().await
    }

    async fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(namespace = %self.namespace, "socket closed");
        }
    }

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }
}

/// Builds [`WsDriver`]s against one endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
}

impl WsConnector {
    /// Connector for `endpoint`, e.g. `ws://localhost:3000`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

impl Connector for WsConnector {
    type Env = SystemEnv;
    type Driver = WsDriver;

    fn env(&self) -> SystemEnv {
        SystemEnv::new()
    }

    fn driver(&self, namespace: Namespace) -> WsDriver {
        WsDriver::new(self.endpoint.clone(), namespace)
    }
}
