//! Gateway operation codes
//!
//! The opcode table is fixed by the platform. Names are resolved through a
//! static table in both directions; nothing is looked up by scanning at runtime.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label used for opcodes missing from the table
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Gateway operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum OpCode {
    /// Server pushes an application event (server only)
    Dispatch = 0,
    /// Keepalive carrying the last sequence number (client only)
    Heartbeat = 1,
    /// Start a new session (client only)
    Identify = 2,
    /// Reattach to an existing session (client only)
    Resume = 6,
    /// Server asks the client to reconnect (server only)
    Reconnect = 7,
    /// Identify/Resume parameters were rejected (server only)
    InvalidSession = 9,
    /// First frame after connect, carries the heartbeat interval (server only)
    Hello = 10,
    /// Heartbeat acknowledged (server only)
    HeartbeatAck = 11,
    /// Acknowledgement of an HTTP callback (server only)
    HttpCallbackAck = 12,
}

/// Every opcode paired with its display label, in numeric order
const OPCODE_TABLE: [(OpCode, &str); 9] = [
    (OpCode::Dispatch, "Dispatch"),
    (OpCode::Heartbeat, "Heartbeat"),
    (OpCode::Identify, "Identify"),
    (OpCode::Resume, "Resume"),
    (OpCode::Reconnect, "Reconnect"),
    (OpCode::InvalidSession, "Invalid Session"),
    (OpCode::Hello, "Hello"),
    (OpCode::HeartbeatAck, "Heartbeat ACK"),
    (OpCode::HttpCallbackAck, "HTTP Callback ACK"),
];

impl OpCode {
    /// All opcodes in numeric order
    pub const ALL: [OpCode; 9] = [
        Self::Dispatch,
        Self::Heartbeat,
        Self::Identify,
        Self::Resume,
        Self::Reconnect,
        Self::InvalidSession,
        Self::Hello,
        Self::HeartbeatAck,
        Self::HttpCallbackAck,
    ];

    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            12 => Some(Self::HttpCallbackAck),
            _ => None,
        }
    }

    /// Get the raw u8 value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Resolve an opcode from its display label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find(|(_, name)| *name == label)
            .map(|(op, _)| *op)
    }

    /// Human readable label, as attached to inbound frames
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::InvalidSession => "Invalid Session",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "Heartbeat ACK",
            Self::HttpCallbackAck => "HTTP Callback ACK",
        }
    }

    /// Label for a raw opcode, `"Unknown"` when it is not in the table
    #[must_use]
    pub const fn label_for(value: u8) -> &'static str {
        match Self::from_u8(value) {
            Some(op) => op.label(),
            None => UNKNOWN_LABEL,
        }
    }

    /// Check if this op code is sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Identify | Self::Resume)
    }

    /// Check if this op code is sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        !self.is_client_op()
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.as_u8())
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}
