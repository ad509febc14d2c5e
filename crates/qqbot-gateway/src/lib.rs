//! # qqbot-gateway
//!
//! Realtime gateway client for the QQ bot platform: access tokens, gateway
//! discovery, the websocket session with heartbeat and resume, per-opcode
//! handlers and the REST request sender.

pub mod auth;
pub mod error;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod rest;
pub mod session;

pub use error::{AuthError, DiscoveryError, GatewayError, GatewayResult, RequestError};
pub use events::{DispatchEvent, DispatchKind, EventConsumer, PassthroughConsumer};
pub use handlers::{handler_fn, EventHandler, HandlerContext};
pub use protocol::{GatewayFrame, Intents, OpCode};
pub use rest::ReplyRoute;
pub use session::{GatewayConfig, GatewaySession, SessionHandle, SessionPhase};
