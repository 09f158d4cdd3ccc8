//! Event listeners.
//!
//! A [`Subscription`] is a registered listener. Dropping it unregisters the
//! listener, so a consumer that subscribes on mount and drops on unmount
//! always nets to zero.

use gigchat_client::ChatEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Registered listener for chat events.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChatEvent>,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<ChatEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, in delivery order.
    ///
    /// A listener that falls behind skips the events it missed. Returns
    /// `None` once no runtime can publish any more.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "subscriber lagged"),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<ChatEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged");
                },
                Err(_) => return None,
            }
        }
    }
}
