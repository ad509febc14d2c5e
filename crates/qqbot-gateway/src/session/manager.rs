//! Gateway session manager
//!
//! [`GatewaySession`] owns the connect loop: token, discovery, quota check,
//! socket, handshake, heartbeat and the close-code policy. [`SessionHandle`]
//! is the cheap, cloneable view that handlers and callers use to send frames,
//! call the REST API and read session state.

use super::{GatewayConfig, Handshake, HeartbeatTimer, Observed, SessionPhase, SessionState};
use crate::auth::{GatewayLocator, TokenProvider};
use crate::error::{GatewayError, GatewayResult, RequestError};
use crate::events::{ConsumerHandler, EventConsumer};
use crate::handlers::{EventHandler, EventHandlerRegistry};
use crate::protocol::{
    CloseAction, GatewayFrame, HelloPayload, IdentifyPayload, OpCode, ResumePayload,
};
use crate::rest::RequestSender;
use chrono::{DateTime, Utc};
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long the writer gets to flush a close frame after the reader stops
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A message queued for the writer task
struct Outbound {
    message: Message,
    /// Fired once the message is written; dropped unfired if it never is
    written: Option<oneshot::Sender<()>>,
}

impl Outbound {
    fn fire_and_forget(message: Message) -> Self {
        Self {
            message,
            written: None,
        }
    }

    fn confirmed(message: Message) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                message,
                written: Some(tx),
            },
            rx,
        )
    }
}

/// Why a single socket connection ended
#[derive(Debug)]
enum ConnectionEnd {
    Shutdown,
    Closed { code: Option<u16>, reason: String },
}

struct SessionInner {
    config: GatewayConfig,
    tokens: Arc<TokenProvider>,
    locator: GatewayLocator,
    requests: RequestSender,
    state: Mutex<SessionState>,
    handlers: EventHandlerRegistry,
    heartbeat: HeartbeatTimer,
    /// Present only while a socket is open
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    message_ids: AtomicU64,
    shutdown: watch::Sender<bool>,
}

/// Cloneable handle to a running (or not yet started) session
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

/// A gateway session: construct, register handlers through
/// [`handle`](Self::handle), then drive it with [`run`](Self::run).
pub struct GatewaySession {
    handle: SessionHandle,
}

impl GatewaySession {
    /// Build a session. No network traffic happens until [`run`](Self::run).
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(GatewayError::Client)?;

        let tokens = Arc::new(
            TokenProvider::new(http.clone(), &config.auth_url, config.credentials.clone())
                .with_refresh_margin(config.token_refresh_margin),
        );
        let locator = GatewayLocator::new(http.clone(), &config.api_base, &config.credentials.app_id);
        let requests = RequestSender::new(http, &config.api_base, Arc::clone(&tokens));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            handle: SessionHandle {
                inner: Arc::new(SessionInner {
                    config,
                    tokens,
                    locator,
                    requests,
                    state: Mutex::new(SessionState::new()),
                    handlers: EventHandlerRegistry::new(),
                    heartbeat: HeartbeatTimer::new(),
                    outbound: Mutex::new(None),
                    message_ids: AtomicU64::new(1),
                    shutdown,
                }),
            },
        })
    }

    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Connect and keep the session alive until shutdown or a fatal error.
    ///
    /// Returns `Ok(())` after [`SessionHandle::shutdown`]. Token, discovery,
    /// quota and socket-open failures, as well as unrecoverable close codes,
    /// are returned as errors and never retried.
    pub async fn run(self) -> GatewayResult<()> {
        let handle = self.handle;
        let result = handle.run_loop().await;

        handle.inner.heartbeat.cancel();
        handle.clear_outbound();
        handle.set_phase(SessionPhase::Closed);

        match &result {
            Ok(()) => tracing::info!("Gateway session stopped"),
            Err(e) => tracing::error!(error = %e, close_code = ?e.close_code(), "Gateway session failed"),
        }

        result
    }
}

impl SessionHandle {
    // === Handlers and events ===

    /// Register `handler` for `op`; `false` if it is already registered
    pub fn register_handler(&self, op: OpCode, handler: Arc<dyn EventHandler>) -> bool {
        self.inner.handlers.register(op, handler)
    }

    /// Remove `handler` from `op`, or every handler for `op` when `None`
    pub fn unregister_handler(&self, op: OpCode, handler: Option<&Arc<dyn EventHandler>>) -> bool {
        self.inner.handlers.unregister(op, handler)
    }

    #[must_use]
    pub fn handler_count(&self, op: OpCode) -> usize {
        self.inner.handlers.handler_count(op)
    }

    /// Feed every Dispatch frame through `consumer` and stream what it yields.
    ///
    /// The stream applies backpressure: a full buffer delays the reader until
    /// the receiver catches up. Dropping the receiver discards later events.
    pub fn subscribe<C: EventConsumer>(&self, consumer: C) -> mpsc::Receiver<C::Event> {
        let (tx, rx) = mpsc::channel(self.inner.config.event_buffer.max(1));
        self.register_handler(OpCode::Dispatch, Arc::new(ConsumerHandler::new(consumer, tx)));
        rx
    }

    /// Next id from this session's message counter, starting at 1
    pub fn next_message_id(&self) -> u64 {
        self.inner.message_ids.fetch_add(1, Ordering::Relaxed)
    }

    // === Outbound ===

    /// Send a frame on the socket.
    ///
    /// Returns `Ok` only after the frame has been written to an open socket.
    /// A frame that the dying socket never took is sent again on the next one.
    /// While the session is between sockets this polls for the new socket
    /// every `send_poll_interval`, giving up with `SendTimeout` after
    /// `send_timeout`. Fails with `Closed` once the session has stopped.
    ///
    /// Handlers run on the reader task, so a handler that must outlive a
    /// reconnect should spawn the send instead of awaiting it: the reader
    /// cannot see the close, and no new socket opens, until it returns.
    pub async fn send_frame(&self, frame: &GatewayFrame) -> GatewayResult<()> {
        let text = frame.to_json()?;
        let send_timeout = self.inner.config.send_timeout;
        let deadline = Instant::now() + send_timeout;

        loop {
            if self.is_closed() {
                return Err(GatewayError::Closed);
            }

            let (outbound, written) = Outbound::confirmed(Message::Text(text.clone()));
            if self.try_write(outbound).is_ok() {
                match time::timeout_at(deadline, written).await {
                    Ok(Ok(())) => return Ok(()),
                    Ok(Err(_)) => {
                        tracing::debug!(op = frame.op, "Frame not written before the socket closed; retrying");
                    }
                    Err(_) => return Err(GatewayError::SendTimeout(send_timeout)),
                }
            }

            if Instant::now() >= deadline {
                return Err(GatewayError::SendTimeout(send_timeout));
            }

            tracing::trace!(op = frame.op, "Socket not open; waiting to send");
            time::sleep(self.inner.config.send_poll_interval).await;
        }
    }

    /// POST to the platform REST API with the cached token
    pub async fn send_request(&self, path: &str, body: &Value) -> Result<Value, RequestError> {
        self.inner.requests.send_request(path, body).await
    }

    #[must_use]
    pub fn requests(&self) -> &RequestSender {
        &self.inner.requests
    }

    // === State ===

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.lock().session_id.clone()
    }

    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.inner.state.lock().sequence
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase
    }

    #[must_use]
    pub fn last_heartbeat_ack(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().last_heartbeat_ack
    }

    /// Copy of the whole session state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.lock().clone()
    }

    #[must_use]
    pub fn heartbeat_armed(&self) -> bool {
        self.inner.heartbeat.is_armed()
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    // === Lifecycle ===

    /// Close the socket, stop the heartbeat and prevent any reconnect
    pub fn shutdown(&self) {
        tracing::info!("Gateway shutdown requested");
        self.inner.shutdown.send_replace(true);
        self.inner.heartbeat.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown.borrow() || self.inner.state.lock().is_closed()
    }

    // === Connect loop ===

    async fn run_loop(&self) -> GatewayResult<()> {
        let mut shutdown = self.inner.shutdown.subscribe();

        loop {
            if *shutdown.borrow_and_update() {
                return Ok(());
            }

            let ws = tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                ws = self.connect() => ws?,
            };

            match self.drive(ws, &mut shutdown).await {
                ConnectionEnd::Shutdown => return Ok(()),
                ConnectionEnd::Closed { code, reason } => {
                    self.inner.heartbeat.cancel();
                    self.clear_outbound();

                    let action = self.inner.state.lock().on_close(code);
                    match action {
                        CloseAction::Resume => {
                            tracing::info!(close_code = ?code, "Gateway session timed out; reconnecting to resume");
                        }
                        CloseAction::Reidentify => {
                            tracing::info!(close_code = ?code, "Gateway session replaced; reconnecting with a new session");
                        }
                        CloseAction::Fatal => {
                            return Err(GatewayError::unrecoverable_close(code, &reason));
                        }
                    }
                }
            }
        }
    }

    /// Forced token refresh, discovery, quota check, socket open
    async fn connect(&self) -> GatewayResult<WsStream> {
        self.set_phase(SessionPhase::Connecting);

        let token = self.inner.tokens.get_token(true).await?;
        let descriptor = self.inner.locator.resolve_gateway(&token).await?;

        if let Err(e) = descriptor.check_quota() {
            tracing::error!(
                remaining = descriptor.session_start_limit.remaining,
                reset_after = descriptor.session_start_limit.reset_after,
                "No session starts left"
            );
            return Err(e);
        }

        tracing::info!(
            url = %descriptor.url,
            remaining = descriptor.session_start_limit.remaining,
            "Opening gateway socket"
        );

        let (ws, _) = connect_async(descriptor.url.as_str()).await?;
        self.inner.state.lock().on_socket_open();

        Ok(ws)
    }

    /// Pump one socket until it closes or shutdown is requested
    async fn drive(&self, ws: WsStream, shutdown: &mut watch::Receiver<bool>) -> ConnectionEnd {
        let (write, mut read) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
        *self.inner.outbound.lock() = Some(tx);

        let mut writer = tokio::spawn(pump_outbound(write, rx));

        let end = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if let Some(tx) = self.inner.outbound.lock().take() {
                        let _ = tx.send(Outbound::fire_and_forget(Message::Close(Some(CloseFrame {
                            code: WsCloseCode::Normal,
                            reason: "shutdown".into(),
                        }))));
                    }
                    break ConnectionEnd::Shutdown;
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.on_text(&text).await,
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or((None, String::new()), |f| {
                            (Some(u16::from(f.code)), f.reason.into_owned())
                        });
                        tracing::debug!(close_code = ?code, reason = %reason, "Gateway closed the socket");
                        break ConnectionEnd::Closed { code, reason };
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Socket read failed");
                        break ConnectionEnd::Closed { code: None, reason: e.to_string() };
                    }
                    None => break ConnectionEnd::Closed { code: None, reason: String::new() },
                },
            }
        };

        self.clear_outbound();
        if time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
            writer.abort();
        }

        end
    }

    async fn on_text(&self, text: &str) {
        let frame = match GatewayFrame::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        tracing::debug!(
            op = frame.op,
            label = frame.label(),
            t = ?frame.t,
            s = ?frame.s,
            "Frame received"
        );

        let observed = self.inner.state.lock().on_frame(&frame);
        log_observed(&observed);

        if frame.is(OpCode::Hello) {
            self.on_hello(&frame).await;
        }

        self.inner.handlers.dispatch(&frame, self).await;
    }

    async fn on_hello(&self, frame: &GatewayFrame) {
        let interval = match frame.payload::<HelloPayload>() {
            Ok(hello) if hello.heartbeat_interval > 0 => Duration::from_millis(hello.heartbeat_interval),
            Ok(_) | Err(_) => {
                tracing::warn!("Hello carried no usable heartbeat interval; using the default");
                Duration::from_millis(HelloPayload::DEFAULT_HEARTBEAT_INTERVAL)
            }
        };

        let handshake = self.inner.state.lock().on_hello();
        self.rearm_heartbeat(interval);

        let token = match self.inner.tokens.get_token(false).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "No token for the handshake");
                return;
            }
        };

        let outbound = match handshake {
            Handshake::Identify => {
                tracing::info!(intents = %self.inner.config.intents, "Identifying");
                GatewayFrame::identify(&IdentifyPayload::new(
                    &token.value,
                    self.inner.config.intents,
                    self.inner.config.identify_properties.clone(),
                ))
            }
            Handshake::Resume { session_id, seq } => {
                tracing::info!(session_id = %session_id, seq = ?seq, "Resuming");
                GatewayFrame::resume(&ResumePayload::new(&token.value, session_id, seq))
            }
            Handshake::None => {
                tracing::debug!("Resume already in flight; ignoring Hello");
                return;
            }
        };

        let sent = match outbound {
            Ok(frame) => self.write_now(&frame),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = sent {
            tracing::warn!(error = %e, "Failed to send handshake");
        }
    }

    fn rearm_heartbeat(&self, interval: Duration) {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Heartbeat armed");

        self.inner
            .heartbeat
            .rearm(interval, self.inner.config.initial_heartbeat_delay, move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        SessionHandle { inner }.heartbeat_tick().await;
                    }
                }
            });
    }

    /// Non-forced token refresh, then a heartbeat with the current sequence
    async fn heartbeat_tick(&self) {
        if let Err(e) = self.inner.tokens.get_token(false).await {
            tracing::warn!(error = %e, "Token refresh failed on heartbeat");
        }

        let seq = self.sequence();
        match self.write_now(&GatewayFrame::heartbeat(seq)) {
            Ok(()) => tracing::trace!(seq = ?seq, "Heartbeat sent"),
            Err(e) => tracing::debug!(error = %e, "Heartbeat skipped"),
        }
    }

    /// Queue on the open socket without waiting for a reconnect or the write
    fn write_now(&self, frame: &GatewayFrame) -> GatewayResult<()> {
        let outbound = Outbound::fire_and_forget(Message::Text(frame.to_json()?));
        self.try_write(outbound).map_err(|_| GatewayError::Closed)
    }

    /// Queue a message on the open socket, handing it back if none is open
    fn try_write(&self, outbound: Outbound) -> Result<(), Outbound> {
        match self.inner.outbound.lock().as_ref() {
            Some(tx) => tx.send(outbound).map_err(|e| e.0),
            None => Err(outbound),
        }
    }

    /// Route a frame to the handlers as if it had arrived on the socket
    #[cfg(test)]
    pub(crate) async fn dispatch_for_test(&self, frame: &GatewayFrame) -> usize {
        self.inner.handlers.dispatch(frame, self).await
    }

    fn clear_outbound(&self) {
        self.inner.outbound.lock().take();
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.inner.state.lock().phase = phase;
    }
}

/// Drain queued messages into the socket until the queue closes, a write
/// fails, or a Close frame goes out.
///
/// Confirmations fire only for messages that were written. On a failed write
/// the remaining queue is dropped with its confirmations unfired, so waiting
/// senders retry on the next socket.
async fn pump_outbound<S>(mut sink: S, mut rx: mpsc::UnboundedReceiver<Outbound>)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(Outbound { message, written }) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "Socket write failed");
            break;
        }
        if let Some(written) = written {
            let _ = written.send(());
        }
        if closing {
            break;
        }
    }
}

fn log_observed(observed: &Observed) {
    match observed {
        Observed::Ready { session_id } => tracing::info!(session_id = %session_id, "Session ready"),
        Observed::Resumed => tracing::info!("Session resumed"),
        Observed::HeartbeatAck => tracing::trace!("Heartbeat acknowledged"),
        Observed::InvalidSession => tracing::warn!("Gateway rejected the session parameters"),
        Observed::ReconnectRequested => {
            tracing::info!("Gateway requested a reconnect; forwarding to handlers");
        }
        Observed::Nothing => {}
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SessionHandle")
            .field("phase", &state.phase)
            .field("session_id", &state.session_id)
            .field("sequence", &state.sequence)
            .finish()
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession").field("handle", &self.handle).finish()
    }
}
