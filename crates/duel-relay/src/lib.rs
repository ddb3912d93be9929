//! # duel-relay
//!
//! A WebSocket relay that pairs two players into a named room and passes
//! their game traffic back and forth.
//!
//! Clients send `{"type":"join","room":"arena1"}`. When a second player
//! joins the same room both receive `{"type":"start"}`; every other frame
//! either player sends is relayed untouched to the opponent. If one side
//! disconnects the other receives `{"type":"win_disconnect"}`. A third
//! joiner gets `{"type":"error"}` and may try another room name.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), duel_relay::RelayError> {
//! use duel_relay::prelude::*;
//!
//! let server = RelayServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    DEFAULT_OUTBOUND_CAPACITY, DEFAULT_PORT, RelayMode, ServerConfig,
};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Re-exports everything needed to run a relay or talk to one.
pub mod prelude {
    pub use crate::{RelayError, RelayMode, RelayServer, RelayServerBuilder, ServerConfig};
    pub use duel_relay_protocol::{Codec, JsonCodec, Message, MessageKind};
    pub use duel_relay_room::{JoinOutcome, LeaveOutcome, RoomManager};
    pub use duel_relay_transport::ConnectionId;
}
