//! Gateway session
//!
//! Lifecycle: `Connecting -> AwaitingHello -> Identifying | Resuming -> Ready`,
//! then `Reconnecting` on a recoverable close or `Closed` for good.

mod config;
mod heartbeat;
mod manager;
mod state;

pub use config::GatewayConfig;
pub use heartbeat::HeartbeatTimer;
pub use manager::{GatewaySession, SessionHandle};
pub use state::{Handshake, Observed, SessionPhase, SessionState};
