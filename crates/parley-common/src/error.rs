//! Error taxonomy for the signaling core.
//!
//! Subscribe rejections are recoverable and reported to the rejected peer
//! only, as a `subRejected` notice carrying a reason string. Malformed
//! frames are dropped where they arrive. Stale-reference conditions
//! (duplicate unsubscribe, unknown peer) are no-ops, not errors.

/// Signaling error type used across the hub and transport.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("room {room:?} already has two members")]
    RoomFull { room: String },

    #[error("room {room:?} already has an owner")]
    OwnerTaken { room: String },

    #[error("room {room:?} already has a non-owner")]
    PeerSlotTaken { room: String },

    #[error("peer is already subscribed to room {room:?}")]
    AlreadySubscribed { room: String },

    #[error("malformed envelope: {0}")]
    Malformed(String),
}

impl SignalError {
    /// Reason string carried in the `subRejected` notice, for the variants
    /// that reject a subscribe attempt.
    pub fn reject_reason(&self) -> Option<&'static str> {
        match self {
            Self::RoomFull { .. } => {
                Some("Only two users allowed in room. Communication disallowed.")
            }
            Self::OwnerTaken { .. } => Some("Owner already exists in room"),
            Self::PeerSlotTaken { .. } => Some("Non-owner already exists in room"),
            Self::AlreadySubscribed { .. } => Some("Already subscribed to a room"),
            Self::Malformed(_) => None,
        }
    }
}

/// Convenience type alias for Results using SignalError.
pub type SignalResult<T> = Result<T, SignalError>;
