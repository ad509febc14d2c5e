//! Gateway frame format
//!
//! Every message on the socket is a JSON object `{op, d, s?, t?}`. The opcode
//! is kept raw so frames with opcodes outside the table still decode and can
//! be labeled "Unknown".

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload, UNKNOWN_LABEL};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single gateway frame, inbound or outbound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayFrame {
    /// Raw operation code, wider than the table so any value decodes
    pub op: i64,

    /// Payload; `null` when absent
    #[serde(default)]
    pub d: Value,

    /// Sequence number, carried by dispatches; negative values read as none
    #[serde(
        default,
        deserialize_with = "non_negative_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub s: Option<u64>,

    /// Event type, carried by dispatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayFrame {
    /// Create a frame with no sequence or event type
    #[must_use]
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: i64::from(op.as_u8()),
            d,
            s: None,
            t: None,
        }
    }

    // === Client frames ===

    /// Identify (op 2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(OpCode::Identify, serde_json::to_value(payload)?))
    }

    /// Resume (op 6)
    pub fn resume(payload: &ResumePayload) -> Result<Self, serde_json::Error> {
        Ok(Self::new(OpCode::Resume, serde_json::to_value(payload)?))
    }

    /// Heartbeat (op 1) carrying the last sequence, or `null` before any
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(
            OpCode::Heartbeat,
            last_sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    // === Server frames ===

    /// Hello (op 10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::new(
            OpCode::Hello,
            serde_json::json!(HelloPayload::with_interval(heartbeat_interval)),
        )
    }

    /// Dispatch (op 0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: i64::from(OpCode::Dispatch.as_u8()),
            d: data,
            s: Some(sequence),
            t: Some(event_type.into()),
        }
    }

    /// Heartbeat ACK (op 11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, Value::Null)
    }

    /// Reconnect request (op 7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::new(OpCode::Reconnect, Value::Null)
    }

    /// Invalid Session (op 9)
    #[must_use]
    pub fn invalid_session() -> Self {
        Self::new(OpCode::InvalidSession, Value::Bool(false))
    }

    // === Inspection ===

    /// Typed opcode, `None` for opcodes outside the table
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        u8::try_from(self.op).ok().and_then(OpCode::from_u8)
    }

    /// Human readable opcode label, `"Unknown"` outside the table
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.opcode().map_or(UNKNOWN_LABEL, OpCode::label)
    }

    #[must_use]
    pub fn is(&self, op: OpCode) -> bool {
        self.op == i64::from(op.as_u8())
    }

    /// Dispatch event type (`t`)
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.t.as_deref()
    }

    /// Decode the payload into a typed body
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.d)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn non_negative_sequence<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| u64::try_from(s).ok()))
}

impl std::fmt::Display for GatewayFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewayFrame(op={} {}", self.op, self.label())?;
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
