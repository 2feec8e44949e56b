//! # parley-common
//!
//! Shared pieces of the parley signaling relay:
//! - the wire vocabulary (inbound envelope decode, hub-originated events)
//! - the error taxonomy
//! - application configuration

pub mod config;
pub mod envelope;
pub mod error;

pub use envelope::{ClientCommand, Inbound, ServerEvent};
pub use error::{SignalError, SignalResult};
