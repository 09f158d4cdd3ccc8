//! JSON envelope framing shared by both directions.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ProtocolError, Result};

/// Envelope as it arrives, before the payload is interpreted.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RawEnvelope {
    pub(crate) fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Envelope(e.to_string()))
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize `data` under `event`.
pub(crate) fn encode<T: Serialize>(event: &'static str, data: &T) -> Result<String> {
    serde_json::to_string(&Envelope { event, data })
        .map_err(|e| ProtocolError::Encode { event, reason: e.to_string() })
}

/// Interpret the payload of `event` as `T`.
pub(crate) fn payload<T: DeserializeOwned>(event: &'static str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| ProtocolError::malformed(event, e.to_string()))
}

/// Reject zero identifiers, which the server never assigns.
pub(crate) fn require_id(event: &'static str, field: &str, id: u64) -> Result<()> {
    if id == 0 {
        return Err(ProtocolError::malformed(event, format!("{field} must be non-zero")));
    }
    Ok(())
}
