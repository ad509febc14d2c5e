//! Test helpers for integration tests
//!
//! A scripted stand-in for the bot platform: an axum app serving the token
//! endpoint, gateway discovery and a REST catch-all, plus a websocket gateway
//! whose connections are handed to the test to drive frame by frame.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use qqbot_common::Credentials;
use qqbot_gateway::{GatewayConfig, GatewaySession};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Path the mock serves access tokens on
pub const TOKEN_PATH: &str = "/app/getAppAccessToken";

/// Path whose requests always fail with a structured error
pub const FAILING_PATH: &str = "/fail";

/// Trace id returned with failing REST responses
pub const FAILING_TRACE_ID: &str = "trace-123";

/// How long a helper waits for the client before failing the test
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// One REST call seen by the mock platform
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub app_id: Option<String>,
    pub body: Value,
}

struct PlatformInner {
    gateway_url: String,
    token_calls: AtomicUsize,
    gateway_calls: AtomicUsize,
    remaining: AtomicI64,
    token_requests: Mutex<Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Mock HTTP side of the platform
pub struct MockPlatform {
    pub addr: SocketAddr,
    inner: Arc<PlatformInner>,
    _handle: JoinHandle<()>,
}

impl MockPlatform {
    /// Serve discovery responses pointing at `gateway_url`
    pub async fn start(gateway_url: impl Into<String>) -> Result<Self> {
        let inner = Arc::new(PlatformInner {
            gateway_url: gateway_url.into(),
            token_calls: AtomicUsize::new(0),
            gateway_calls: AtomicUsize::new(0),
            remaining: AtomicI64::new(1000),
            token_requests: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(TOKEN_PATH, post(issue_token))
            .route("/gateway/bot", get(gateway_bot))
            .fallback(rest_call)
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            inner,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn auth_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.base_url())
    }

    /// Session starts reported by `/gateway/bot`
    pub fn set_remaining(&self, remaining: i64) {
        self.inner.remaining.store(remaining, Ordering::SeqCst);
    }

    pub fn token_calls(&self) -> usize {
        self.inner.token_calls.load(Ordering::SeqCst)
    }

    pub fn gateway_calls(&self) -> usize {
        self.inner.gateway_calls.load(Ordering::SeqCst)
    }

    pub fn token_requests(&self) -> Vec<Value> {
        self.inner.token_requests.lock().clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().clone()
    }
}

async fn issue_token(State(state): State<Arc<PlatformInner>>, Json(body): Json<Value>) -> Json<Value> {
    state.token_requests.lock().push(body);
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;

    // The platform sends the TTL as a string
    Json(json!({
        "access_token": format!("token-{n}"),
        "expires_in": "7200"
    }))
}

async fn gateway_bot(State(state): State<Arc<PlatformInner>>, headers: HeaderMap) -> Response {
    state.gateway_calls.fetch_add(1, Ordering::SeqCst);

    if !headers.contains_key("authorization") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "code": 11244, "message": "no token" })))
            .into_response();
    }

    Json(json!({
        "url": state.gateway_url,
        "shards": 1,
        "session_start_limit": {
            "total": 1000,
            "remaining": state.remaining.load(Ordering::SeqCst),
            "reset_after": 86_400_000,
            "max_concurrency": 1
        }
    }))
    .into_response()
}

async fn rest_call(
    State(state): State<Arc<PlatformInner>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let path = uri.path().to_string();
    state.requests.lock().push(RecordedRequest {
        path: path.clone(),
        authorization: header("authorization"),
        app_id: header("x-union-appid"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    if path.starts_with(FAILING_PATH) {
        return (
            StatusCode::BAD_REQUEST,
            [("X-Tps-trace-ID", FAILING_TRACE_ID)],
            Json(json!({ "code": 11255, "message": "invalid request" })),
        )
            .into_response();
    }

    Json(json!({ "id": "reply-1", "path": path })).into_response()
}

/// Mock websocket gateway
///
/// Every accepted socket is queued for the test to pick up with
/// [`next_connection`](Self::next_connection).
pub struct MockGateway {
    pub url: String,
    accepted: Arc<AtomicUsize>,
    connections: mpsc::UnboundedReceiver<GatewayConnection>,
    _handle: JoinHandle<()>,
}

impl MockGateway {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("ws://{}/websocket", listener.local_addr()?);
        let accepted = Arc::new(AtomicUsize::new(0));
        let (tx, connections) = mpsc::unbounded_channel();

        let counter = Arc::clone(&accepted);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if tx.send(GatewayConnection { ws }).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            url,
            accepted,
            connections,
            _handle: handle,
        })
    }

    /// Sockets opened so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn next_connection(&mut self) -> Result<GatewayConnection> {
        timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .map_err(|_| anyhow!("client did not connect"))?
            .ok_or_else(|| anyhow!("gateway listener stopped"))
    }
}

/// Server side of one gateway socket
pub struct GatewayConnection {
    ws: WebSocketStream<TcpStream>,
}

impl GatewayConnection {
    pub async fn send(&mut self, frame: Value) -> Result<()> {
        self.ws.send(Message::Text(frame.to_string())).await?;
        Ok(())
    }

    pub async fn hello(&mut self, heartbeat_interval: u64) -> Result<()> {
        self.send(json!({ "op": 10, "d": { "heartbeat_interval": heartbeat_interval } }))
            .await
    }

    /// Next text frame from the client
    pub async fn recv(&mut self) -> Result<Value> {
        let deadline = Instant::now() + STEP_TIMEOUT;
        loop {
            let message = timeout(deadline.saturating_duration_since(Instant::now()), self.ws.next())
                .await
                .map_err(|_| anyhow!("no frame from client"))?;

            match message {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) | None => bail!("client closed the socket"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Next client frame with opcode `op`, skipping everything else
    pub async fn recv_op(&mut self, op: u64) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            if frame["op"].as_u64() == Some(op) {
                return Ok(frame);
            }
        }
    }

    /// Close with `code` and wait for the client's close reply
    pub async fn close(mut self, code: u16, reason: &str) -> Result<()> {
        self.ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            })))
            .await?;

        let _ = timeout(STEP_TIMEOUT, async {
            while let Some(Ok(_)) = self.ws.next().await {}
        })
        .await;
        Ok(())
    }
}

/// Mock platform and gateway wired together
pub struct TestBed {
    pub platform: MockPlatform,
    pub gateway: MockGateway,
}

impl TestBed {
    pub async fn start() -> Result<Self> {
        let gateway = MockGateway::start().await?;
        let platform = MockPlatform::start(gateway.url.clone()).await?;
        Ok(Self { platform, gateway })
    }

    /// Session config pointing at the mocks
    pub fn config(&self) -> GatewayConfig {
        GatewayConfig::new(test_credentials())
            .with_endpoints(self.platform.auth_url(), self.platform.base_url())
            .with_send_timeout(Duration::from_secs(3))
    }

    pub fn session(&self) -> Result<GatewaySession> {
        Ok(GatewaySession::new(self.config())?)
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(STEP_TIMEOUT).build()?)
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new("102000001", "test-secret")
}

/// Poll `condition` until it holds or the step timeout passes
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) -> Result<()> {
    let deadline = Instant::now() + STEP_TIMEOUT;
    while !condition() {
        if Instant::now() >= deadline {
            bail!("timed out waiting for {what}");
        }
        sleep(Duration::from_millis(20)).await;
    }
    Ok(())
}
