//! Websocket transport for the client.
//!
//! Provides [`ConnectedClient`] which carries text frames over one websocket.
//! This is a thin layer that only moves frames; protocol logic remains in
//! the Sans-IO [`Client`](crate::Client).

use futures::{SinkExt, StreamExt};
use gigchat_proto::{Namespace, ProtocolError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Capacity of the frame channels in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Socket is gone.
    #[error("socket closed")]
    Closed,

    /// Frame could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Handle to an open websocket.
///
/// Frames are sent/received via the channels, and an internal task handles
/// the socket I/O. `from_server` yields `None` once the socket is closed.
/// Dropping the handle closes the socket gracefully; [`Self::stop`] aborts.
pub struct ConnectedClient {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive text frames from the server.
    pub from_server: mpsc::Receiver<String>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Open a websocket to `<endpoint>/<namespace>`.
///
/// The URL carries no credential; the handshake frame does.
///
/// # Errors
///
/// - `TransportError::Connection` if the websocket cannot be established
pub async fn connect(endpoint: &str, namespace: Namespace) -> Result<ConnectedClient, TransportError> {
    let url = namespace.url(endpoint);
    let (socket, _response) =
        connect_async(url.as_str()).await.map_err(|e| TransportError::Connection(e.to_string()))?;
    debug!(%url, "websocket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Bridge between the channels and the socket until either side closes.
async fn run_connection<S>(
    socket: S,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<String>,
) where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(text) = outgoing else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!("websocket send failed: {e}");
                    break;
                }
            },
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if from_server.send(text.as_str().to_owned()).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "websocket closed by server");
                        break;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        warn!("websocket receive failed: {e}");
                        break;
                    },
                    None => break,
                }
            },
        }
    }
}
