//! WebSocket close codes
//!
//! Close codes the gateway sends when it drops a connection, and the recovery
//! policy the client applies to each of them.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Invalid opcode sent
    InvalidOpcode = 4001,
    /// Invalid payload sent
    InvalidPayload = 4002,
    /// Session id rejected on resume
    InvalidSessionId = 4006,
    /// Sequence number rejected on resume
    InvalidSequence = 4007,
    /// Payloads sent too quickly
    RateLimited = 4008,
    /// Session expired; the client may resume
    SessionTimeout = 4009,
    /// Invalid shard
    InvalidShard = 4010,
    /// Too many guilds for a single shard
    ShardingRequired = 4011,
    /// Invalid gateway version
    InvalidVersion = 4012,
    /// Invalid intents
    InvalidIntent = 4013,
    /// Intents the bot is not permitted to use
    DisallowedIntent = 4014,
    /// Another connection resumed the same session
    ResumeCollision = 4908,
    /// Bot is offline (sandbox only)
    BotOffline = 4914,
    /// Bot has been banned
    BotBanned = 4915,
}

/// What the session manager does after the socket closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Reconnect keeping session identity; the next Hello resumes
    Resume,
    /// Reconnect and start a fresh session with Identify
    Reidentify,
    /// Stop and surface the failure
    Fatal,
}

impl CloseAction {
    /// Recovery policy for a raw close code.
    ///
    /// Only 4009 and 4908 are recoverable. Everything else, including an
    /// abnormal closure without a close frame, is fatal.
    #[must_use]
    pub const fn for_code(code: Option<u16>) -> Self {
        match code {
            Some(4009) => Self::Resume,
            Some(4908) => Self::Reidentify,
            _ => Self::Fatal,
        }
    }

    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4001 => Some(Self::InvalidOpcode),
            4002 => Some(Self::InvalidPayload),
            4006 => Some(Self::InvalidSessionId),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidVersion),
            4013 => Some(Self::InvalidIntent),
            4014 => Some(Self::DisallowedIntent),
            4908 => Some(Self::ResumeCollision),
            4914 => Some(Self::BotOffline),
            4915 => Some(Self::BotBanned),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Recovery policy for this code
    #[must_use]
    pub const fn action(self) -> CloseAction {
        CloseAction::for_code(Some(self.as_u16()))
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidOpcode => "Invalid opcode",
            Self::InvalidPayload => "Invalid payload",
            Self::InvalidSessionId => "Invalid session id",
            Self::InvalidSequence => "Invalid sequence number",
            Self::RateLimited => "Payloads sent too quickly",
            Self::SessionTimeout => "Session timed out",
            Self::InvalidShard => "Invalid shard",
            Self::ShardingRequired => "Too many guilds for one shard",
            Self::InvalidVersion => "Invalid gateway version",
            Self::InvalidIntent => "Invalid intents",
            Self::DisallowedIntent => "Intents not permitted",
            Self::ResumeCollision => "Session resumed elsewhere",
            Self::BotOffline => "Bot offline",
            Self::BotBanned => "Bot banned",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Describe a raw close code for logs and error messages
#[must_use]
pub fn describe_close(code: Option<u16>) -> String {
    match code {
        Some(raw) => match CloseCode::from_u16(raw) {
            Some(known) => known.to_string(),
            None => format!("close code {raw}"),
        },
        None => "connection dropped without a close frame".to_string(),
    }
}
