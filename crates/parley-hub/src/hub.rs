//! Room registry and message routing.
//!
//! The hub is the single source of truth for membership: which peer is in
//! which room, in what role, and in what join order. All mutation funnels
//! through one lock, so the two members of a room can never observe a
//! half-applied join or leave.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parley_common::config::HubConfig;
use parley_common::envelope::ServerEvent;
use parley_common::error::{SignalError, SignalResult};
use serde::Serialize;
use tokio::sync::{RwLock, mpsc};

use crate::peer::{Peer, PeerId, PushError};

const ROOM_CAPACITY: usize = 2;

/// A named room: at most two peers, kept in join order. The earlier joiner
/// becomes the caller when the room fills, so the order is load-bearing.
#[derive(Debug)]
struct Room {
    members: Vec<PeerId>,
    created_at: DateTime<Utc>,
}

impl Room {
    fn new() -> Self {
        Self {
            members: Vec::with_capacity(ROOM_CAPACITY),
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct HubState {
    peers: HashMap<PeerId, Peer>,
    rooms: HashMap<String, Room>,
}

impl HubState {
    /// Queue a frame to one peer. A peer whose queue is full or closed is
    /// dead for signaling purposes and gets evicted on the spot.
    fn deliver(&mut self, target: PeerId, frame: String) {
        let Some(peer) = self.peers.get(&target) else {
            return;
        };
        match peer.push(frame) {
            Ok(()) => {}
            Err(PushError::Backlogged) => {
                tracing::warn!(peer = %target, "Outbound queue full, disconnecting peer");
                self.evict(target);
            }
            Err(PushError::Gone) => {
                tracing::debug!(peer = %target, "Outbound queue closed, dropping peer");
                self.evict(target);
            }
        }
    }

    /// Remove a peer entirely: leave its room (notifying the remaining
    /// member) and drop its record.
    fn evict(&mut self, peer_id: PeerId) {
        self.leave_room(peer_id);
        self.peers.remove(&peer_id);
    }

    /// Shared leave path for unsubscribe, disconnect, and eviction. Returns
    /// the left room's name, or None if the peer was not in a room.
    fn leave_room(&mut self, peer_id: PeerId) -> Option<String> {
        let room_name = self.peers.get_mut(&peer_id).and_then(|peer| {
            peer.is_owner = false;
            peer.room.take()
        })?;

        let mut remaining = Vec::new();
        if let Some(room) = self.rooms.get_mut(&room_name) {
            room.members.retain(|m| *m != peer_id);
            remaining = room.members.clone();
        }
        if remaining.is_empty() {
            self.rooms.remove(&room_name);
            tracing::debug!(room = %room_name, "Room empty, removed");
        }

        let offline = ServerEvent::ImOffline {
            room: room_name.clone(),
        }
        .to_wire();
        for member in remaining {
            self.deliver(member, offline.clone());
        }

        Some(room_name)
    }
}

/// The signaling hub.
///
/// Cheap to clone; all clones share one registry behind a single `RwLock`.
/// No operation blocks on a peer: delivery goes through bounded queues and
/// stalled peers are evicted rather than waited on.
#[derive(Clone)]
pub struct SignalHub {
    state: Arc<RwLock<HubState>>,
    config: HubConfig,
}

impl SignalHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
            config,
        }
    }

    /// Register a newly accepted transport connection. The returned id is
    /// the transport's handle for all further calls.
    pub async fn connect(&self, outbound: mpsc::Sender<String>) -> PeerId {
        let peer = Peer::new(outbound);
        let id = peer.id;
        self.state.write().await.peers.insert(id, peer);
        tracing::debug!(peer = %id, "Peer connected");
        id
    }

    /// Subscribe a peer to a room.
    ///
    /// On rejection the subscriber alone is sent a `subRejected` notice and
    /// no state changes. On success every member already in the room gets a
    /// `newSub`, the joiner gets one `newSub` back if the room was occupied,
    /// and if the room just filled, the earlier joiner is told to place the
    /// call via `startCall`, queued strictly after its `newSub`.
    pub async fn subscribe(
        &self,
        peer_id: PeerId,
        room_name: &str,
        is_owner: bool,
    ) -> SignalResult<()> {
        let mut state = self.state.write().await;

        if !state.peers.contains_key(&peer_id) {
            // stale handle, the transport already tore this peer down
            return Ok(());
        }

        if let Err(err) =
            Self::admission(&state, peer_id, room_name, is_owner, self.config.enforce_roles)
        {
            tracing::info!(peer = %peer_id, room = %room_name, %err, "Subscribe rejected");
            let notice = ServerEvent::SubRejected {
                reason: err.reject_reason().map(str::to_string),
            };
            state.deliver(peer_id, notice.to_wire());
            return Err(err);
        }

        let existing = {
            let room = state
                .rooms
                .entry(room_name.to_string())
                .or_insert_with(Room::new);
            let existing = room.members.clone();
            room.members.push(peer_id);
            existing
        };
        if let Some(peer) = state.peers.get_mut(&peer_id) {
            peer.room = Some(room_name.to_string());
            peer.is_owner = is_owner;
        }

        tracing::info!(peer = %peer_id, room = %room_name, is_owner, "Peer subscribed");

        let new_sub = ServerEvent::NewSub {
            room: room_name.to_string(),
        }
        .to_wire();
        for member in &existing {
            state.deliver(*member, new_sub.clone());
        }
        if !existing.is_empty() {
            // the joiner learns the room was already occupied
            state.deliver(peer_id, new_sub);
        }

        if existing.len() + 1 == ROOM_CAPACITY {
            let caller = existing[0];
            let start = ServerEvent::StartCall {
                room: room_name.to_string(),
                is_caller: true,
            };
            state.deliver(caller, start.to_wire());
            tracing::info!(room = %room_name, caller = %caller, "Room full, call initiation triggered");
        }

        Ok(())
    }

    /// Policy checks only, no mutation. A rejected subscribe leaves no
    /// trace, not even a lazily created empty room.
    fn admission(
        state: &HubState,
        peer_id: PeerId,
        room_name: &str,
        is_owner: bool,
        enforce_roles: bool,
    ) -> SignalResult<()> {
        if let Some(current) = state.peers.get(&peer_id).and_then(|p| p.room()) {
            return Err(SignalError::AlreadySubscribed {
                room: current.to_string(),
            });
        }

        let Some(room) = state.rooms.get(room_name) else {
            return Ok(());
        };

        if room.members.len() >= ROOM_CAPACITY {
            return Err(SignalError::RoomFull {
                room: room_name.to_string(),
            });
        }

        if enforce_roles {
            let mut owner_present = false;
            let mut non_owner_present = false;
            for member in room.members.iter().filter_map(|m| state.peers.get(m)) {
                if member.is_owner() {
                    owner_present = true;
                } else {
                    non_owner_present = true;
                }
            }
            if is_owner && owner_present {
                return Err(SignalError::OwnerTaken {
                    room: room_name.to_string(),
                });
            }
            if !is_owner && non_owner_present {
                return Err(SignalError::PeerSlotTaken {
                    room: room_name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Remove a peer from its current room, notifying the remaining member
    /// with `imOffline` and deleting the room if it became empty. No-op when
    /// the peer is not in a room; safe to call twice.
    pub async fn unsubscribe(&self, peer_id: PeerId) {
        let mut state = self.state.write().await;
        if let Some(room) = state.leave_room(peer_id) {
            tracing::info!(peer = %peer_id, room = %room, "Peer unsubscribed");
        }
    }

    /// Forward a raw frame, verbatim, to the other member of the sender's
    /// current room. The payload is never parsed here. No-op when the sender
    /// is not in a room.
    pub async fn relay(&self, peer_id: PeerId, raw: &str) {
        let mut state = self.state.write().await;

        let Some(room_name) = state
            .peers
            .get(&peer_id)
            .and_then(|p| p.room().map(str::to_string))
        else {
            tracing::debug!(peer = %peer_id, "Relay from peer outside any room, dropped");
            return;
        };

        let targets: Vec<PeerId> = state
            .rooms
            .get(&room_name)
            .map(|room| {
                room.members
                    .iter()
                    .copied()
                    .filter(|m| *m != peer_id)
                    .collect()
            })
            .unwrap_or_default();

        for target in targets {
            state.deliver(target, raw.to_string());
        }
    }

    /// Tear a peer down: implicit unsubscribe plus registry removal. Called
    /// by the transport on socket close, whether or not the peer ever sent
    /// an explicit unsubscribe.
    pub async fn disconnect(&self, peer_id: PeerId) {
        let mut state = self.state.write().await;
        state.leave_room(peer_id);
        if state.peers.remove(&peer_id).is_some() {
            tracing::debug!(peer = %peer_id, "Peer disconnected");
        }
    }

    /// Current occupancy snapshot.
    pub async fn stats(&self) -> HubStats {
        let state = self.state.read().await;
        HubStats {
            active_rooms: state.rooms.len(),
            connected_peers: state.peers.len(),
            subscribed_peers: state.peers.values().filter(|p| p.room.is_some()).count(),
            rooms: state
                .rooms
                .iter()
                .map(|(name, room)| RoomInfo {
                    name: name.clone(),
                    members: room.members.len(),
                    created_at: room.created_at,
                })
                .collect(),
        }
    }
}

/// Global hub statistics.
#[derive(Debug, Serialize)]
pub struct HubStats {
    pub active_rooms: usize,
    pub connected_peers: usize,
    pub subscribed_peers: usize,
    pub rooms: Vec<RoomInfo>,
}

/// Per-room summary.
#[derive(Debug, Serialize)]
pub struct RoomInfo {
    pub name: String,
    pub members: usize,
    pub created_at: DateTime<Utc>,
}
