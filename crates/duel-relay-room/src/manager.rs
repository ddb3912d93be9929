//! Room manager: join, leave, and relay against the shared registry.

use duel_relay_protocol::{Codec, Message};
use duel_relay_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::registry::RoomRegistry;
use crate::room::{PlayerSender, ROOM_CAPACITY, deliver};
use crate::RoomError;

/// Reason carried by the `error` frame a rejected joiner receives.
pub const ROOM_FULL_REASON: &str = "room is full";

/// Result of a successful [`RoomManager::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First player in; waiting for an opponent.
    Waiting,
    /// Second player in; both were sent `start`.
    Started,
    /// The connection was already in that room. Nothing changed.
    AlreadyInRoom,
}

/// Result of [`RoomManager::leave`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was in no room.
    NotInRoom,
    /// The connection was the last member; the room is gone.
    RoomClosed { room: String },
    /// The remaining member was sent `win_disconnect`.
    OpponentNotified { room: String },
}

/// Owns the [`RoomRegistry`] and serializes every operation on it.
///
/// One mutex guards all rooms. Peer deliveries made under it are
/// non-blocking queue pushes, so a stalled socket cannot hold the lock.
///
/// Server frames (`start`, `error`, `win_disconnect`) are encoded with the
/// manager's codec. Gameplay frames are relayed as the caller's bytes.
pub struct RoomManager<C: Codec> {
    registry: Mutex<RoomRegistry>,
    codec: C,
}

impl<C: Codec> RoomManager<C> {
    /// Creates a manager with an empty registry.
    pub fn new(codec: C) -> Self {
        Self {
            registry: Mutex::new(RoomRegistry::new()),
            codec,
        }
    }

    /// Puts `conn` into `room`, creating the room on first join.
    ///
    /// A full room gets the joiner an `error` frame and
    /// [`RoomError::RoomFull`]; the connection keeps whatever membership it
    /// had. Joining a different room first leaves the current one, with the
    /// usual forfeit notice to the opponent left behind. When the room
    /// reaches two members both are sent `start`.
    pub async fn join(
        &self,
        conn: ConnectionId,
        sender: PlayerSender,
        room: &str,
    ) -> Result<JoinOutcome, RoomError> {
        let start = self.codec.encode(&Message::start())?;
        let full = self.codec.encode(&Message::error(ROOM_FULL_REASON))?;
        let forfeit = self.codec.encode(&Message::win_disconnect())?;

        let mut registry = self.registry.lock().await;

        if registry.room_of(conn) == Some(room) {
            return Ok(JoinOutcome::AlreadyInRoom);
        }

        if registry.is_full(room) {
            tracing::info!(%conn, room, "join rejected, room full");
            deliver(conn, &sender, full);
            return Err(RoomError::RoomFull(room.to_string()));
        }

        if registry.room_of(conn).is_some() {
            depart(&mut registry, conn, Some(&forfeit));
        }

        let members = registry.insert(conn, sender, room);
        tracing::info!(%conn, room, members, "player joined");

        if members < ROOM_CAPACITY {
            return Ok(JoinOutcome::Waiting);
        }

        if let Some(joined) = registry.room(room) {
            joined.send_all(&start);
        }
        tracing::info!(room, "room full, match started");
        Ok(JoinOutcome::Started)
    }

    /// Relays `frame` to everyone else in the sender's room.
    ///
    /// Returns the number of peers it was queued for. A sender in no room,
    /// or alone in one, relays to nobody and that is not an error.
    pub async fn broadcast(&self, conn: ConnectionId, frame: &[u8]) -> usize {
        let registry = self.registry.lock().await;
        let Some(room) = registry.room_of(conn).and_then(|r| registry.room(r))
        else {
            tracing::trace!(%conn, "relay from unassigned connection dropped");
            return 0;
        };
        room.send_others(conn, frame)
    }

    /// Removes `conn` from its room.
    ///
    /// Deletes the room if it empties, otherwise tells the remaining
    /// player they won by forfeit. Safe to call any number of times.
    pub async fn leave(&self, conn: ConnectionId) -> LeaveOutcome {
        let forfeit = match self.codec.encode(&Message::win_disconnect()) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!(error = %e, "cannot encode forfeit notice");
                None
            }
        };
        let mut registry = self.registry.lock().await;
        depart(&mut registry, conn, forfeit.as_deref())
    }

    /// The room `conn` is in, if any.
    pub async fn room_of(&self, conn: ConnectionId) -> Option<String> {
        self.registry.lock().await.room_of(conn).map(str::to_string)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.room_count()
    }

    /// Number of members in `room`; 0 if it does not exist.
    pub async fn member_count(&self, room: &str) -> usize {
        self.registry.lock().await.member_count(room)
    }
}

/// Takes `conn` out of its room under the caller's lock and notifies
/// whoever remains.
fn depart(
    registry: &mut RoomRegistry,
    conn: ConnectionId,
    forfeit: Option<&[u8]>,
) -> LeaveOutcome {
    let Some(departure) = registry.remove(conn) else {
        return LeaveOutcome::NotInRoom;
    };
    let room = departure.room;

    if !departure.room_survives {
        tracing::info!(%conn, room = %room, "last player left, room closed");
        return LeaveOutcome::RoomClosed { room };
    }

    tracing::info!(%conn, room = %room, "player left, opponent wins by forfeit");
    if let (Some(frame), Some(remaining)) = (forfeit, registry.room(&room)) {
        remaining.send_all(frame);
    }
    LeaveOutcome::OpponentNotified { room }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_relay_protocol::JsonCodec;
    use tokio::sync::mpsc;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn queue() -> (PlayerSender, mpsc::Receiver<Vec<u8>>) {
        mpsc::channel(8)
    }

    #[tokio::test]
    async fn test_switching_rooms_forfeits_previous_room() {
        let mgr = RoomManager::new(JsonCodec);
        let (a_tx, mut a_rx) = queue();
        let (b_tx, _b_rx) = queue();

        mgr.join(conn(1), a_tx, "arena1").await.unwrap();
        mgr.join(conn(2), b_tx.clone(), "arena1").await.unwrap();
        assert_eq!(a_rx.try_recv().unwrap(), br#"{"type":"start"}"#);

        let outcome = mgr.join(conn(2), b_tx, "arena2").await.unwrap();
        assert_eq!(outcome, JoinOutcome::Waiting);
        assert_eq!(a_rx.try_recv().unwrap(), br#"{"type":"win_disconnect"}"#);
        assert_eq!(mgr.member_count("arena1").await, 1);
        assert_eq!(mgr.room_of(conn(2)).await.as_deref(), Some("arena2"));
    }

    #[tokio::test]
    async fn test_rejoining_same_room_is_noop() {
        let mgr = RoomManager::new(JsonCodec);
        let (a_tx, mut a_rx) = queue();

        mgr.join(conn(1), a_tx.clone(), "arena1").await.unwrap();
        let again = mgr.join(conn(1), a_tx, "arena1").await.unwrap();
        assert_eq!(again, JoinOutcome::AlreadyInRoom);
        assert_eq!(mgr.member_count("arena1").await, 1);
        assert!(a_rx.try_recv().is_err(), "no start for a lone player");
    }

    #[tokio::test]
    async fn test_full_target_keeps_current_membership() {
        let mgr = RoomManager::new(JsonCodec);
        let (a_tx, _a_rx) = queue();
        let (b_tx, _b_rx) = queue();
        let (c_tx, mut c_rx) = queue();

        mgr.join(conn(1), a_tx, "full").await.unwrap();
        mgr.join(conn(2), b_tx, "full").await.unwrap();
        mgr.join(conn(3), c_tx.clone(), "lobby").await.unwrap();

        let err = mgr.join(conn(3), c_tx, "full").await.unwrap_err();
        assert!(matches!(err, RoomError::RoomFull(ref r) if r == "full"));
        assert_eq!(mgr.room_of(conn(3)).await.as_deref(), Some("lobby"));
        assert_eq!(
            c_rx.try_recv().unwrap(),
            br#"{"type":"error","room":"room is full"}"#
        );
    }
}
