//! The message type that travels on the wire between players and the relay.
//!
//! Every frame is a flat JSON object:
//!
//! ```text
//! {"type": "update", "room": "", "x": 5.0, "y": 2.0, "vx": 0.0, "vy": 0.0}
//! ```
//!
//! Only `type` is required. The relay reads `type` (and `room` for joins)
//! and nothing else; gameplay frames are forwarded as the bytes that
//! arrived, so fields this module does not know about survive the trip.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The `type` tag of a [`Message`].
///
/// The relay only acts on [`Join`](Self::Join); every other client kind is
/// gameplay traffic and is forwarded verbatim. Kinds the relay has no name
/// for land in [`Other`](Self::Other) so they round-trip unchanged.
///
/// Serde goes through the string form (`#[serde(from, into)]`) rather than
/// a derived enum representation, because a derived one would reject any
/// tag it does not list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// Client → Server: "Put me in this room."
    Join,
    /// Server → Client: the room is full, the match begins.
    Start,
    /// Server → Client: a request was refused (the room was full).
    Error,
    /// Server → Client: your opponent left, you win by forfeit.
    WinDisconnect,
    /// Gameplay: position/velocity update.
    Update,
    /// Gameplay: a shot was fired.
    Shoot,
    /// Gameplay: a shot landed.
    Hit,
    /// Any other gameplay tag, kept as sent.
    Other(String),
}

impl MessageKind {
    /// Returns the wire spelling of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Join => "join",
            Self::Start => "start",
            Self::Error => "error",
            Self::WinDisconnect => "win_disconnect",
            Self::Update => "update",
            Self::Shoot => "shoot",
            Self::Hit => "hit",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "join" => Self::Join,
            "start" => Self::Start,
            "error" => Self::Error,
            "win_disconnect" => Self::WinDisconnect,
            "update" => Self::Update,
            "shoot" => Self::Shoot,
            "hit" => Self::Hit,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One frame of the relay protocol.
///
/// `room` is meaningful only on `join` (the target room) and on `error`
/// (the human-readable reason; the wire format has no other string slot).
/// The numeric fields belong to gameplay kinds and are never interpreted
/// by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The message tag. Required on every frame.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Target room for `join`, reason for `error`, otherwise empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,

    /// Horizontal position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    /// Vertical position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Horizontal velocity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,

    /// Vertical velocity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
}

impl Message {
    /// Creates a bare message of the given kind with no room or payload.
    pub fn new(kind: impl Into<MessageKind>) -> Self {
        Self {
            kind: kind.into(),
            room: String::new(),
            x: None,
            y: None,
            vx: None,
            vy: None,
        }
    }

    /// `{"type":"join","room":<room>}`
    pub fn join(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            ..Self::new(MessageKind::Join)
        }
    }

    /// `{"type":"start"}`, sent to both players when a room fills.
    pub fn start() -> Self {
        Self::new(MessageKind::Start)
    }

    /// `{"type":"win_disconnect"}`, sent to the player left behind.
    pub fn win_disconnect() -> Self {
        Self::new(MessageKind::WinDisconnect)
    }

    /// `{"type":"error","room":<reason>}`
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            room: reason.into(),
            ..Self::new(MessageKind::Error)
        }
    }

    /// Sets the position fields.
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Sets the velocity fields.
    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.vx = Some(vx);
        self.vy = Some(vy);
        self
    }

    /// Returns `true` if this frame asks to join a room.
    pub fn is_join(&self) -> bool {
        self.kind == MessageKind::Join
    }
}

// =========================================================================
// Tests
// =========================================================================
