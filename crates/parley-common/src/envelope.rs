//! Wire envelope — the JSON vocabulary exchanged over the signaling socket.
//!
//! Every frame is a JSON object carrying an `action` tag. Only `subscribe`
//! and `unsubscribe` are interpreted by the hub; everything else (`sdp`,
//! `candidate`, `toggleVideo`, client presence echoes, ...) is routed as an
//! opaque payload to the other room member, byte-for-byte. Decoding therefore
//! classifies frames rather than fully parsing them.

use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// Commands the hub interprets, decoded at the transport boundary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Join a named room. The empty room name is a valid, if unconventional,
    /// key. `isOwner` defaults to false when absent.
    Subscribe {
        #[serde(default)]
        room: String,
        #[serde(default)]
        is_owner: bool,
    },

    /// Leave the current room. The `room` field is carried on the wire but
    /// the hub routes by its own registry, not by this value.
    Unsubscribe {
        #[serde(default)]
        room: String,
    },
}

/// Classification of one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Command(ClientCommand),
    /// Unrecognized action — forward the raw frame verbatim.
    Relay,
}

/// Classify a raw inbound frame.
///
/// Frames that are not JSON objects with a string `action` are malformed and
/// get dropped by the caller; a bad frame must never reach a room.
pub fn decode(raw: &str) -> Result<Inbound, SignalError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| SignalError::Malformed(e.to_string()))?;

    let Some(action) = value.get("action").and_then(|a| a.as_str()) else {
        return Err(SignalError::Malformed("missing or non-string action".into()));
    };

    match action {
        "subscribe" | "unsubscribe" => {
            let command = serde_json::from_value(value)
                .map_err(|e| SignalError::Malformed(e.to_string()))?;
            Ok(Inbound::Command(command))
        }
        _ => Ok(Inbound::Relay),
    }
}

/// Messages the hub originates toward peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Room membership changed: someone is now sharing the room.
    NewSub { room: String },

    /// The room reached two members; the recipient is the designated caller.
    StartCall { room: String, is_caller: bool },

    /// The other member left the room.
    ImOffline { room: String },

    /// A subscribe attempt was refused.
    SubRejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl ServerEvent {
    /// Wire encoding pushed onto a peer's outbound queue.
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}
