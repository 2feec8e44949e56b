//! A connected signaling peer.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

pub type PeerId = Uuid;

/// One transport connection, as the hub sees it.
///
/// Pure data holder plus a routing handle: the hub pushes wire frames onto
/// the bounded outbound queue and the transport's writer task drains it onto
/// the socket. Room and role are set exclusively by the hub's subscribe and
/// unsubscribe paths.
#[derive(Debug)]
pub struct Peer {
    pub id: PeerId,
    outbound: mpsc::Sender<String>,
    pub(crate) room: Option<String>,
    pub(crate) is_owner: bool,
    pub connected_at: DateTime<Utc>,
}

impl Peer {
    pub(crate) fn new(outbound: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            room: None,
            is_owner: false,
            connected_at: Utc::now(),
        }
    }

    /// Name of the room this peer is currently subscribed to, if any.
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Queue one frame for delivery. Never blocks: a full or closed queue
    /// means the peer is stalled or already gone, and the error says which.
    pub(crate) fn push(&self, frame: String) -> Result<(), PushError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Backlogged,
            mpsc::error::TrySendError::Closed(_) => PushError::Gone,
        })
    }
}

/// Why a frame could not be queued to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushError {
    /// The outbound queue is full; the peer has stopped draining.
    Backlogged,
    /// The transport side of the queue is gone.
    Gone,
}
