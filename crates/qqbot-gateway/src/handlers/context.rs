//! Per-frame handler context

use crate::session::SessionHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Passed to every handler invoked for one inbound frame
///
/// Clones share the stop flag, so a handler that moves its context into a
/// spawned task can still stop propagation for the frame it was given.
#[derive(Clone)]
pub struct HandlerContext {
    session: SessionHandle,
    stopped: Arc<AtomicBool>,
}

impl HandlerContext {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Self {
            session,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Skip the remaining handlers for this frame
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The session the frame arrived on
    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
