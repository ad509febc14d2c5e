//! Dispatch events
//!
//! Event type names, typed message payloads and the consumer seam that turns
//! Dispatch frames into a stream of application events.

mod consumer;
mod event_types;
mod payloads;

pub(crate) use consumer::ConsumerHandler;
pub use consumer::{DispatchEvent, EventConsumer, PassthroughConsumer};
pub use event_types::DispatchKind;
pub use payloads::{MessageAttachment, MessageAuthor, MessagePayload};
