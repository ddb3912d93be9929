//! A single two-player room and the outbound queues of its members.

use std::collections::HashMap;

use duel_relay_transport::ConnectionId;
use tokio::sync::mpsc;

/// A room never holds more than this many connections.
pub const ROOM_CAPACITY: usize = 2;

/// Sending half of a connection's bounded outbound queue.
///
/// The room manager only ever `try_send`s into it, so holding the
/// registry lock never waits on a slow socket. The connection's writer
/// task owns the receiving half.
pub type PlayerSender = mpsc::Sender<Vec<u8>>;

/// The members of one named room.
#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<ConnectionId, PlayerSender>,
}

impl Room {
    /// Creates an empty room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections in the room.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if nobody is in the room.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if the room cannot take another player.
    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    /// Returns `true` if `conn` is a member.
    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.members.contains_key(&conn)
    }

    /// Adds a member. Callers check [`is_full`](Self::is_full) first.
    pub(crate) fn add(&mut self, conn: ConnectionId, sender: PlayerSender) {
        debug_assert!(!self.is_full() || self.contains(conn));
        self.members.insert(conn, sender);
    }

    /// Removes a member, returning `true` if it was present.
    pub(crate) fn remove(&mut self, conn: ConnectionId) -> bool {
        self.members.remove(&conn).is_some()
    }

    /// Member IDs in ascending order.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.members.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Queues `frame` for every member. Returns how many queues took it.
    pub(crate) fn send_all(&self, frame: &[u8]) -> usize {
        self.members
            .iter()
            .filter(|(conn, sender)| deliver(**conn, sender, frame.to_vec()))
            .count()
    }

    /// Queues `frame` for every member except `sender_conn`.
    pub(crate) fn send_others(
        &self,
        sender_conn: ConnectionId,
        frame: &[u8],
    ) -> usize {
        self.members
            .iter()
            .filter(|(conn, _)| **conn != sender_conn)
            .filter(|(conn, sender)| deliver(**conn, sender, frame.to_vec()))
            .count()
    }
}

/// Queues a frame without waiting. A full or closed queue drops the frame;
/// the peer's own session notices its dead socket and cleans up.
pub(crate) fn deliver(
    conn: ConnectionId,
    sender: &PlayerSender,
    frame: Vec<u8>,
) -> bool {
    match sender.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(%conn, "outbound queue full, dropping frame");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!(%conn, "outbound queue closed, dropping frame");
            false
        }
    }
}
