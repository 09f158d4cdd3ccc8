//! Client errors.

use gigchat_core::ConnectionError;
use gigchat_proto::ProtocolError;
use thiserror::Error;

/// Errors from [`crate::Client::handle`].
///
/// None of these leave state half-applied: a rejected frame changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Frame failed envelope or payload validation.
    #[error("rejected frame: {0}")]
    Protocol(#[from] ProtocolError),

    /// Event arrived in a connection state that cannot accept it.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
