//! Gateway payload definitions
//!
//! Typed `d` bodies for the frames the client sends and the handshake frames
//! it reads.

use super::Intents;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scheme prefix the platform expects in front of an access token
pub const TOKEN_SCHEME: &str = "QQBot";

/// Format an access token the way the platform expects it in both the
/// `Authorization` header and the Identify/Resume payloads.
#[must_use]
pub fn bot_token(access_token: &str) -> String {
    format!("{TOKEN_SCHEME} {access_token}")
}

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Interval the platform announces in practice (41.25 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 41_250;

    /// Create a Hello payload with custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// `QQBot <access token>`
    pub token: String,

    /// Subscribed event groups
    pub intents: Intents,

    /// `[shard_id, shard_count]`; always `[0, 1]`
    pub shard: [u32; 2],

    /// Client connection properties
    pub properties: IdentifyProperties,
}

impl IdentifyPayload {
    /// Single shard used for every session
    pub const SINGLE_SHARD: [u32; 2] = [0, 1];

    #[must_use]
    pub fn new(access_token: &str, intents: Intents, properties: IdentifyProperties) -> Self {
        Self {
            token: bot_token(access_token),
            intents,
            shard: Self::SINGLE_SHARD,
            properties,
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    #[serde(rename = "$os")]
    pub os: String,

    /// Client library name
    #[serde(rename = "$browser")]
    pub browser: String,

    /// Device name
    #[serde(rename = "$device")]
    pub device: String,
}

impl IdentifyProperties {
    #[must_use]
    pub fn new(os: impl Into<String>, browser: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            browser: browser.into(),
            device: device.into(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new(std::env::consts::OS, env!("CARGO_PKG_NAME"), env!("CARGO_PKG_NAME"))
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// `QQBot <access token>`
    pub token: String,

    /// Session ID from the READY dispatch
    pub session_id: String,

    /// Last sequence number received
    pub seq: u64,
}

impl ResumePayload {
    #[must_use]
    pub fn new(access_token: &str, session_id: impl Into<String>, seq: Option<u64>) -> Self {
        Self {
            token: bot_token(access_token),
            session_id: session_id.into(),
            seq: seq.unwrap_or(0),
        }
    }
}

/// Body of the `READY` dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,

    #[serde(default)]
    pub version: Option<u32>,

    /// Bot user object
    #[serde(default)]
    pub user: Option<Value>,

    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}
