//! Event consumers
//!
//! A consumer turns Dispatch frames into the caller's own event type. The
//! session feeds it through an adapter handler and streams the results over a
//! bounded channel.

use super::{DispatchKind, MessagePayload};
use crate::handlers::{EventHandler, HandlerContext};
use crate::protocol::GatewayFrame;
use crate::rest::ReplyRoute;
use crate::session::SessionHandle;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Normalizes Dispatch frames into events
///
/// Returning `None` drops the frame from the stream; the frame still reaches
/// every other handler.
pub trait EventConsumer: Send + Sync + 'static {
    type Event: Send + 'static;

    fn consume(&self, frame: &GatewayFrame, session: &SessionHandle) -> Option<Self::Event>;
}

/// Registers a consumer as a Dispatch handler
pub(crate) struct ConsumerHandler<C: EventConsumer> {
    consumer: C,
    events: mpsc::Sender<C::Event>,
}

impl<C: EventConsumer> ConsumerHandler<C> {
    pub(crate) fn new(consumer: C, events: mpsc::Sender<C::Event>) -> Self {
        Self { consumer, events }
    }
}

#[async_trait]
impl<C: EventConsumer> EventHandler for ConsumerHandler<C> {
    async fn handle(&self, frame: &GatewayFrame, ctx: &HandlerContext) {
        if self.events.is_closed() {
            return;
        }

        let Some(event) = self.consumer.consume(frame, ctx.session()) else {
            return;
        };

        if self.events.send(event).await.is_err() {
            tracing::debug!(t = ?frame.t, "Event receiver dropped; discarding event");
        }
    }
}

/// Dispatch frame with the fields most callers need pulled out
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    /// Local id from the session's message counter
    pub message_id: u64,

    /// Raw `t` value
    pub event_type: String,

    /// Parsed `t`; `None` for event types this crate does not know
    pub kind: Option<DispatchKind>,

    pub sequence: Option<u64>,

    /// Where a reply to this event is posted, when it has a conversation
    #[serde(skip)]
    pub reply_route: Option<ReplyRoute>,

    pub data: Value,

    pub received_at: DateTime<Utc>,
}

impl DispatchEvent {
    /// Typed message payload for message-bearing events
    #[must_use]
    pub fn message(&self) -> Option<MessagePayload> {
        if !self.kind.is_some_and(DispatchKind::is_message) {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Emits a [`DispatchEvent`] for every Dispatch frame that names its type
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConsumer;

impl EventConsumer for PassthroughConsumer {
    type Event = DispatchEvent;

    fn consume(&self, frame: &GatewayFrame, session: &SessionHandle) -> Option<DispatchEvent> {
        let event_type = frame.event_type()?;

        Some(DispatchEvent {
            message_id: session.next_message_id(),
            event_type: event_type.to_string(),
            kind: DispatchKind::from_str(event_type),
            sequence: frame.s,
            reply_route: ReplyRoute::for_dispatch(event_type, &frame.d),
            data: frame.d.clone(),
            received_at: Utc::now(),
        })
    }
}
