//! Event handler trait

use super::HandlerContext;
use crate::protocol::GatewayFrame;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Receives inbound frames for the opcodes it is registered on
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, frame: &GatewayFrame, ctx: &HandlerContext);
}

/// Adapts an async closure into an [`EventHandler`]
///
/// The closure receives its own copy of the frame and context so the future
/// it returns can be `'static`.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(GatewayFrame, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, frame: &GatewayFrame, ctx: &HandlerContext) {
        (self.f)(frame.clone(), ctx.clone()).await;
    }
}

/// Wrap an async closure as a shareable handler.
///
/// Keep the returned `Arc` to unregister the handler later.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(GatewayFrame, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(FnHandler::new(f))
}
