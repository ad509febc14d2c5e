//! Opcode to handler registry

use super::{EventHandler, HandlerContext};
use crate::protocol::{GatewayFrame, OpCode};
use crate::session::SessionHandle;
use dashmap::DashMap;
use std::sync::Arc;

/// Ordered handler lists keyed by opcode
///
/// A handler is identified by its `Arc` allocation, so registering the same
/// `Arc` twice for one opcode is a no-op.
#[derive(Default)]
pub struct EventHandlerRegistry {
    handlers: DashMap<OpCode, Vec<Arc<dyn EventHandler>>>,
}

impl EventHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `op`.
    ///
    /// Returns `false` if it was already registered for `op`.
    pub fn register(&self, op: OpCode, handler: Arc<dyn EventHandler>) -> bool {
        let mut list = self.handlers.entry(op).or_default();
        if list.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
            return false;
        }
        list.push(handler);
        true
    }

    /// Remove the first registration of `handler` for `op`, or every handler
    /// for `op` when `handler` is `None`.
    ///
    /// Returns `false` if nothing was registered for `op` or `handler` was not
    /// found.
    pub fn unregister(&self, op: OpCode, handler: Option<&Arc<dyn EventHandler>>) -> bool {
        let Some(mut list) = self.handlers.get_mut(&op) else {
            return false;
        };

        match handler {
            None => {
                list.clear();
                true
            }
            Some(handler) => match list.iter().position(|existing| Arc::ptr_eq(existing, handler)) {
                Some(index) => {
                    list.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    /// Number of handlers registered for `op`
    #[must_use]
    pub fn handler_count(&self, op: OpCode) -> usize {
        self.handlers.get(&op).map_or(0, |list| list.len())
    }

    /// Run the handlers for the frame's opcode in registration order, stopping
    /// early if one of them calls [`HandlerContext::stop`].
    ///
    /// Returns how many handlers ran. Frames with an unknown opcode reach no
    /// handler.
    pub async fn dispatch(&self, frame: &GatewayFrame, session: &SessionHandle) -> usize {
        let Some(op) = frame.opcode() else {
            return 0;
        };

        // Snapshot so handlers may (un)register without holding the shard lock
        let snapshot: Vec<Arc<dyn EventHandler>> = match self.handlers.get(&op) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let ctx = HandlerContext::new(session.clone());
        let mut invoked = 0;
        for handler in snapshot {
            handler.handle(frame, &ctx).await;
            invoked += 1;
            if ctx.is_stopped() {
                tracing::trace!(op = %op, invoked, "Propagation stopped");
                break;
            }
        }
        invoked
    }
}

impl std::fmt::Debug for EventHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(OpCode, usize)> = self
            .handlers
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();
        f.debug_struct("EventHandlerRegistry")
            .field("handlers", &counts)
            .finish()
    }
}
