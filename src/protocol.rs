//! JSON envelopes exchanged with the game proxy.
//!
//! Every WebSocket text frame carries one `{ "type": ..., "data": ... }`
//! object. Inbound frames may use any type; only `data` matters to the client.
//! Outbound frames are always commands.

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const COMMAND_TYPE: &str = "cmd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub data: String,
}

impl Envelope {
    pub fn command(data: impl Into<String>) -> Self {
        Self {
            kind: COMMAND_TYPE.to_string(),
            data: data.into(),
        }
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Extract the payload of an inbound frame. Malformed frames (not JSON, or no
/// `data` string) are dropped.
pub fn decode_inbound(frame: &str) -> Option<String> {
    match serde_json::from_str::<Envelope>(frame) {
        Ok(envelope) => Some(envelope.data),
        Err(e) => {
            debug!("Dropping malformed frame ({}): {:?}", e, frame);
            None
        }
    }
}
