//! Gateway protocol definitions
//!
//! Op codes, close codes, the frame format, typed payloads and intents.

mod close_codes;
mod frames;
mod intents;
mod opcodes;
mod payloads;

pub use close_codes::{describe_close, CloseAction, CloseCode};
pub use frames::GatewayFrame;
pub use intents::Intents;
pub use opcodes::{OpCode, UNKNOWN_LABEL};
pub use payloads::{
    bot_token, HelloPayload, IdentifyPayload, IdentifyProperties, ReadyPayload, ResumePayload,
    TOKEN_SCHEME,
};
