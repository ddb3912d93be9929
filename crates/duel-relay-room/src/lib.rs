//! Two-player room lifecycle for duel-relay.
//!
//! Rooms are named on first join, start when a second player arrives, and
//! disappear when the last player leaves. All membership state lives in
//! one [`RoomRegistry`] guarded by the [`RoomManager`]'s single mutex.
//!
//! # Key types
//!
//! - [`RoomManager`]: join / leave / broadcast under one lock
//! - [`RoomRegistry`]: room name → members, connection → room name
//! - [`Room`]: the members of one room and their outbound queues
//! - [`PlayerSender`]: a connection's bounded outbound queue

mod error;
mod manager;
mod registry;
mod room;

pub use error::RoomError;
pub use manager::{JoinOutcome, LeaveOutcome, ROOM_FULL_REASON, RoomManager};
pub use registry::RoomRegistry;
pub use room::{PlayerSender, ROOM_CAPACITY, Room};
