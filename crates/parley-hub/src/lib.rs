//! # parley-hub
//!
//! The signaling core: an in-memory state machine that tracks named rooms of
//! at most two peers, enforces membership and role policy, and routes opaque
//! WebRTC negotiation payloads between the two members.
//!
//! Per room the occupancy runs `empty → one member → two members` and back;
//! reaching two members designates the earlier joiner as the caller, and a
//! room whose last member leaves is removed, never retained. The transport
//! layer (see `parley-server`) feeds decoded frames in and drains each peer's
//! outbound queue; the hub itself never blocks on a peer.

pub mod hub;
pub mod peer;

pub use hub::{HubStats, RoomInfo, SignalHub};
pub use peer::{Peer, PeerId};
