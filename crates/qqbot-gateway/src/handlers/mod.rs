//! Inbound frame handlers
//!
//! Handlers are registered per opcode and awaited one after another, in
//! registration order, for every frame carrying that opcode.

mod context;
mod handler;
mod registry;

pub use context::HandlerContext;
pub use handler::{handler_fn, EventHandler, FnHandler};
pub use registry::EventHandlerRegistry;
