//! The room registry: every room and which room each connection is in.
//!
//! Plain data, no locking. [`RoomManager`](crate::RoomManager) owns the
//! only instance behind its mutex; tests may build one directly.

use std::collections::HashMap;

use duel_relay_transport::ConnectionId;

use crate::room::{PlayerSender, Room};

/// What removing a connection from its room left behind.
#[derive(Debug)]
pub(crate) struct Departure {
    pub(crate) room: String,
    /// `false` when the room was emptied and deleted.
    pub(crate) room_survives: bool,
}

/// Maps room names to rooms, and connections back to room names.
///
/// Invariants, upheld by every method:
/// - no room in `rooms` is empty (rooms appear on first join and vanish
///   on last leave);
/// - no room holds more than [`ROOM_CAPACITY`](crate::ROOM_CAPACITY)
///   connections;
/// - `memberships[c] == name` exactly when `rooms[name]` contains `c`.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    memberships: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The room `conn` is currently in, if any.
    pub fn room_of(&self, conn: ConnectionId) -> Option<&str> {
        self.memberships.get(&conn).map(String::as_str)
    }

    /// Looks up a room by name.
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Returns `true` if `name` exists and has no free slot.
    pub fn is_full(&self, name: &str) -> bool {
        self.rooms.get(name).is_some_and(Room::is_full)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of connections in a room, or 0 if it does not exist.
    pub fn member_count(&self, name: &str) -> usize {
        self.rooms.get(name).map_or(0, Room::len)
    }

    /// Puts `conn` into `name`, creating the room if needed. Returns the
    /// room's new size.
    ///
    /// The caller has already checked capacity and removed `conn` from any
    /// previous room.
    pub(crate) fn insert(
        &mut self,
        conn: ConnectionId,
        sender: PlayerSender,
        name: &str,
    ) -> usize {
        debug_assert!(!self.memberships.contains_key(&conn));
        let room = self.rooms.entry(name.to_string()).or_default();
        room.add(conn, sender);
        self.memberships.insert(conn, name.to_string());
        room.len()
    }

    /// Takes `conn` out of its room, deleting the room if it empties.
    pub(crate) fn remove(&mut self, conn: ConnectionId) -> Option<Departure> {
        let name = self.memberships.remove(&conn)?;
        let Some(room) = self.rooms.get_mut(&name) else {
            return Some(Departure {
                room: name,
                room_survives: false,
            });
        };
        room.remove(conn);
        let room_survives = !room.is_empty();
        if !room_survives {
            self.rooms.remove(&name);
        }
        Some(Departure {
            room: name,
            room_survives,
        })
    }
}
