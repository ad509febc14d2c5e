//! Session state and protocol transitions
//!
//! Everything the handshake, heartbeat and reconnect policy need to agree on
//! lives in one [`SessionState`]. The manager keeps it behind a single mutex
//! and only the reader task mutates it. The transitions here perform no I/O.

use crate::protocol::{CloseAction, GatewayFrame, OpCode, ReadyPayload};
use chrono::{DateTime, Utc};
use std::fmt;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Refreshing the token, resolving the gateway, opening the socket
    #[default]
    Connecting,
    /// Socket open, waiting for Hello
    AwaitingHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// Resume sent, waiting for RESUMED
    Resuming,
    /// Receiving dispatches
    Ready,
    /// Socket closed with a recoverable code
    Reconnecting,
    /// Stopped for good
    Closed,
}

impl SessionPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting_hello",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handshake to send in reply to Hello
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Start a fresh session
    Identify,
    /// Reattach to `session_id` from `seq`
    Resume { session_id: String, seq: Option<u64> },
    /// A resume is already in flight
    None,
}

/// What an inbound frame changed, for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Ready { session_id: String },
    Resumed,
    HeartbeatAck,
    InvalidSession,
    ReconnectRequested,
    Nothing,
}

/// Shared session bookkeeping
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Issued by READY, required to resume
    pub session_id: Option<String>,
    /// Highest `s` seen; `None` until the first sequenced frame
    pub sequence: Option<u64>,
    /// A Resume was sent and RESUMED has not arrived yet
    pub resuming: bool,
    /// At least one Identify went out; cleared by a hard reconnect
    pub initialized: bool,
    pub phase: SessionPhase,
    pub last_heartbeat_ack: Option<DateTime<Utc>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sequence number, keeping the highest seen
    pub fn observe_sequence(&mut self, seq: u64) {
        self.sequence = Some(self.sequence.map_or(seq, |current| current.max(seq)));
    }

    /// Socket opened; the next frame should be Hello
    pub fn on_socket_open(&mut self) {
        self.phase = SessionPhase::AwaitingHello;
    }

    /// Decide the handshake for a Hello and move to the matching phase.
    ///
    /// Resume when this is a reconnect of an initialized session whose id is
    /// known, unless a resume is already in flight. Identify otherwise.
    pub fn on_hello(&mut self) -> Handshake {
        match (&self.session_id, self.initialized) {
            (Some(session_id), true) => {
                if self.resuming {
                    return Handshake::None;
                }
                self.resuming = true;
                self.phase = SessionPhase::Resuming;
                Handshake::Resume {
                    session_id: session_id.clone(),
                    seq: self.sequence,
                }
            }
            _ => {
                self.initialized = true;
                self.resuming = false;
                self.phase = SessionPhase::Identifying;
                Handshake::Identify
            }
        }
    }

    /// Apply an inbound frame: sequence tracking, READY/RESUMED bookkeeping
    /// and heartbeat acknowledgements.
    pub fn on_frame(&mut self, frame: &GatewayFrame) -> Observed {
        if let Some(seq) = frame.s {
            self.observe_sequence(seq);
        }

        match frame.opcode() {
            Some(OpCode::Dispatch) => match frame.event_type() {
                Some("READY") => match frame.payload::<ReadyPayload>() {
                    Ok(ready) => {
                        self.session_id = Some(ready.session_id.clone());
                        self.resuming = false;
                        self.phase = SessionPhase::Ready;
                        Observed::Ready {
                            session_id: ready.session_id,
                        }
                    }
                    Err(_) => Observed::Nothing,
                },
                Some("RESUMED") => {
                    self.resuming = false;
                    self.phase = SessionPhase::Ready;
                    Observed::Resumed
                }
                _ => Observed::Nothing,
            },
            Some(OpCode::HeartbeatAck) => {
                self.last_heartbeat_ack = Some(Utc::now());
                Observed::HeartbeatAck
            }
            Some(OpCode::InvalidSession) => Observed::InvalidSession,
            Some(OpCode::Reconnect) => Observed::ReconnectRequested,
            _ => Observed::Nothing,
        }
    }

    /// Apply the close-code policy.
    ///
    /// 4009 keeps the session identity so the next Hello resumes. 4908 drops
    /// the session id and sequence and clears `initialized`, so the next Hello
    /// identifies and the new session's sequence starts from scratch. Anything
    /// else closes the session.
    pub fn on_close(&mut self, code: Option<u16>) -> CloseAction {
        let action = CloseAction::for_code(code);
        match action {
            CloseAction::Resume => {
                self.resuming = false;
                self.phase = SessionPhase::Reconnecting;
            }
            CloseAction::Reidentify => {
                self.session_id = None;
                self.sequence = None;
                self.initialized = false;
                self.resuming = false;
                self.phase = SessionPhase::Reconnecting;
            }
            CloseAction::Fatal => {
                self.phase = SessionPhase::Closed;
            }
        }
        action
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }
}
