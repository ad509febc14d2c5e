//! Gateway error types

use crate::protocol::describe_close;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure to obtain an access token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed token response: {0}")]
    Malformed(String),
}

/// Failure to resolve the gateway endpoint
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Gateway discovery request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway discovery returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed gateway descriptor: {0}")]
    Malformed(String),
}

/// Errors surfaced by the gateway session
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The platform refused to start another session right now
    #[error("Session start limit exhausted ({remaining} remaining, resets in {reset_after} ms)")]
    SessionLimitExceeded { remaining: i64, reset_after: u64 },

    /// The socket closed with a code that allows no recovery
    #[error("Gateway closed the connection: {reason}")]
    UnrecoverableClose { code: Option<u16>, reason: String },

    #[error("WebSocket error: {0}")]
    Socket(#[source] Box<tungstenite::Error>),

    #[error("Failed to encode or decode a frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// No socket became available within the send deadline
    #[error("No open socket after waiting {0:?}")]
    SendTimeout(Duration),

    #[error("Session is closed")]
    Closed,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    /// Whether this error ends the session
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::SendTimeout(_))
    }

    /// Close code carried by an `UnrecoverableClose`
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::UnrecoverableClose { code, .. } => *code,
            _ => None,
        }
    }

    /// Build an `UnrecoverableClose` from the raw close code and the reason
    /// text the server attached, if any.
    #[must_use]
    pub fn unrecoverable_close(code: Option<u16>, server_reason: &str) -> Self {
        let mut reason = describe_close(code);
        if !server_reason.is_empty() {
            reason.push_str(": ");
            reason.push_str(server_reason);
        }
        Self::UnrecoverableClose { code, reason }
    }
}

impl From<tungstenite::Error> for GatewayError {
    fn from(err: tungstenite::Error) -> Self {
        Self::Socket(Box::new(err))
    }
}

/// Failure of a REST call; returned to the caller as a value
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response, with the platform's error body when it has one
    #[error("Request returned {status}: {message}")]
    Status {
        status: u16,
        code: Option<i64>,
        message: String,
        trace_id: Option<String>,
    },

    #[error("Malformed response body: {0}")]
    Decode(String),

    /// No token has been issued yet
    #[error("No access token available")]
    NoToken,
}

impl RequestError {
    /// HTTP status, when the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::NoToken => None,
        }
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
