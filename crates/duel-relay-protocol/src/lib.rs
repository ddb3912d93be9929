//! Wire protocol for duel-relay.
//!
//! - **Types** ([`Message`], [`MessageKind`]): the flat JSON frames
//!   players and the relay exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those frames are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing so.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Room manager (routing)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Message, MessageKind};
