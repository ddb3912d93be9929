//! Unified error type for the relay server.

use duel_relay_protocol::ProtocolError;
use duel_relay_room::RoomError;
use duel_relay_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, upgrade, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// An environment setting could not be understood.
    #[error("invalid configuration: {0}")]
    Config(String),
}
