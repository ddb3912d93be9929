//! Error types for the room layer.

use duel_relay_protocol::ProtocolError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room already holds two players. The joining connection has
    /// been sent an `error` frame and stays where it was.
    #[error("room {0:?} is full")]
    RoomFull(String),

    /// A server frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
