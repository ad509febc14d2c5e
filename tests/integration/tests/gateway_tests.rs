//! Gateway session integration tests
//!
//! Each test runs a real session against the mock platform and scripts the
//! gateway side of the socket.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;

use anyhow::Result;
use integration_tests::*;
use parking_lot::Mutex;
use qqbot_gateway::auth::TokenProvider;
use qqbot_gateway::rest::RequestSender;
use qqbot_gateway::{
    handler_fn, DispatchKind, GatewayError, GatewayFrame, HandlerContext, Intents, OpCode,
    ReplyRoute, RequestError, SessionPhase,
};
use serde_json::json;

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_identify_after_hello() -> Result<()> {
    let mut bed = TestBed::start().await?;
    let session = bed.session()?;
    let handle = session.handle();
    let run = tokio::spawn(session.run());

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;

    let identify = conn.recv_op(2).await?;
    assert_eq!(identify["d"]["token"], "QQBot token-1");
    assert_eq!(identify["d"]["intents"], Intents::PUBLIC_DEFAULT.bits());
    assert_eq!(identify["d"]["shard"], json!([0, 1]));
    assert!(identify["d"]["properties"]["$os"].is_string());
    assert_eq!(handle.phase(), SessionPhase::Identifying);

    conn.send(ready(1)).await?;
    wait_until("READY", || handle.session_id().as_deref() == Some(SESSION_ID)).await?;
    assert_eq!(handle.phase(), SessionPhase::Ready);
    assert_eq!(handle.sequence(), Some(1));

    // First heartbeat follows the initial delay and carries the sequence
    let heartbeat = conn.recv_op(1).await?;
    assert_eq!(heartbeat["d"], 1);
    assert!(handle.heartbeat_armed());

    conn.send(heartbeat_ack()).await?;
    wait_until("heartbeat ack", || handle.last_heartbeat_ack().is_some()).await?;

    handle.shutdown();
    run.await??;

    assert_eq!(handle.phase(), SessionPhase::Closed);
    assert!(!handle.heartbeat_armed());
    assert_eq!(bed.platform.token_calls(), 1);
    assert_eq!(bed.platform.gateway_calls(), 1);

    let token_request = &bed.platform.token_requests()[0];
    assert_eq!(token_request["appId"], test_credentials().app_id);
    assert_eq!(token_request["clientSecret"], test_credentials().client_secret);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_quota_never_opens_socket() -> Result<()> {
    let bed = TestBed::start().await?;
    bed.platform.set_remaining(0);

    let err = bed.session()?.run().await.unwrap_err();

    assert!(matches!(err, GatewayError::SessionLimitExceeded { remaining: 0, .. }));
    assert!(err.is_fatal());
    assert_eq!(bed.gateway.accepted(), 0);
    assert_eq!(bed.platform.token_calls(), 1);
    assert_eq!(bed.platform.gateway_calls(), 1);
    Ok(())
}

// ============================================================================
// Close-code policy
// ============================================================================

#[tokio::test]
async fn test_session_timeout_close_resumes() -> Result<()> {
    let mut bed = TestBed::start().await?;
    let session = bed.session()?;
    let handle = session.handle();
    let run = tokio::spawn(session.run());

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;
    conn.recv_op(2).await?;
    conn.send(ready(1)).await?;
    conn.send(group_at_message(5, "before close")).await?;
    wait_until("sequence 5", || handle.sequence() == Some(5)).await?;

    conn.close(4009, "session timed out").await?;
    wait_until("reconnect", || {
        !matches!(handle.phase(), SessionPhase::Ready | SessionPhase::Identifying)
    })
    .await?;

    // Queued while no socket is open; delivered on the next one
    let pending = handle.clone();
    let queued = tokio::spawn(async move { pending.send_frame(&GatewayFrame::heartbeat(Some(42))).await });

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;

    // The queued frame may land before or after the handshake
    let mut resume = None;
    let mut saw_queued = false;
    while resume.is_none() || !saw_queued {
        let frame = conn.recv().await?;
        if frame["op"] == 6 {
            resume = Some(frame);
        } else if frame["op"] == 1 && frame["d"] == 42 {
            saw_queued = true;
        }
    }
    queued.await??;

    let resume = resume.unwrap_or_default();
    assert_eq!(resume["d"]["session_id"], SESSION_ID);
    assert_eq!(resume["d"]["seq"], 5);
    assert_eq!(resume["d"]["token"], "QQBot token-2");
    assert_eq!(handle.phase(), SessionPhase::Resuming);

    conn.send(resumed(6)).await?;
    wait_until("RESUMED", || !handle.state().resuming).await?;
    assert_eq!(handle.phase(), SessionPhase::Ready);
    assert_eq!(handle.session_id().as_deref(), Some(SESSION_ID));

    handle.shutdown();
    run.await??;

    assert_eq!(bed.gateway.accepted(), 2);
    assert_eq!(bed.platform.token_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_session_collision_close_reidentifies() -> Result<()> {
    let mut bed = TestBed::start().await?;
    let session = bed.session()?;
    let handle = session.handle();
    let run = tokio::spawn(session.run());

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;
    conn.recv_op(2).await?;
    conn.send(ready(3)).await?;
    conn.send(group_at_message(50, "old session")).await?;
    wait_until("sequence 50", || handle.sequence() == Some(50)).await?;

    conn.close(4908, "session collision").await?;

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;

    let handshake = loop {
        let frame = conn.recv().await?;
        if frame["op"] != 1 {
            break frame;
        }
    };
    assert_eq!(handshake["op"], 2, "expected Identify, got {handshake}");
    assert_eq!(handshake["d"]["token"], "QQBot token-2");
    assert!(handle.state().initialized);
    assert_eq!(handle.session_id(), None);

    // The new session numbers its frames from 1 again
    conn.send(ready_for("new-session", 1)).await?;
    conn.send(group_at_message(2, "new session")).await?;
    wait_until("new session", || handle.sequence() == Some(2)).await?;
    assert_eq!(handle.session_id().as_deref(), Some("new-session"));

    handle.shutdown();
    run.await??;
    Ok(())
}

#[tokio::test]
async fn test_unknown_close_code_is_fatal() -> Result<()> {
    let mut bed = TestBed::start().await?;
    let session = bed.session()?;
    let handle = session.handle();
    let run = tokio::spawn(session.run());

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;
    conn.recv_op(2).await?;
    conn.close(4004, "invalid token").await?;

    let err = run.await?.unwrap_err();

    assert!(matches!(err, GatewayError::UnrecoverableClose { code: Some(4004), .. }));
    assert_eq!(err.close_code(), Some(4004));
    assert!(err.to_string().contains("invalid token"));
    assert_eq!(handle.phase(), SessionPhase::Closed);
    assert_eq!(bed.gateway.accepted(), 1);

    let send = handle.send_frame(&GatewayFrame::heartbeat(None)).await;
    assert!(matches!(send, Err(GatewayError::Closed)));
    Ok(())
}

// ============================================================================
// Handlers and events
// ============================================================================

#[tokio::test]
async fn test_handlers_events_and_replies() -> Result<()> {
    let mut bed = TestBed::start().await?;
    let session = bed.session()?;
    let handle = session.handle();

    let mut events = handle.subscribe(qqbot_gateway::PassthroughConsumer);

    // Replies to every group message through the REST sender
    let replies = Arc::new(Mutex::new(Vec::new()));
    let reply_log = Arc::clone(&replies);
    handle.register_handler(
        OpCode::Dispatch,
        handler_fn(move |frame: GatewayFrame, ctx: HandlerContext| {
            let reply_log = Arc::clone(&reply_log);
            async move {
                let Some(route) = frame.event_type().and_then(|t| ReplyRoute::for_dispatch(t, &frame.d)) else {
                    return;
                };
                let result = ctx
                    .session()
                    .send_request(&route.messages_path(), &json!({ "content": "pong", "msg_type": 0 }))
                    .await;
                reply_log.lock().push(result.is_ok());
            }
        }),
    );

    let reconnects = Arc::new(Mutex::new(0));
    let reconnect_count = Arc::clone(&reconnects);
    handle.register_handler(
        OpCode::Reconnect,
        handler_fn(move |_frame, _ctx| {
            let reconnect_count = Arc::clone(&reconnect_count);
            async move {
                *reconnect_count.lock() += 1;
            }
        }),
    );

    let run = tokio::spawn(session.run());

    let mut conn = bed.gateway.next_connection().await?;
    conn.hello(SLOW_HEARTBEAT_MS).await?;
    conn.recv_op(2).await?;
    conn.send(ready(1)).await?;
    conn.send(group_at_message(2, " hello ")).await?;

    let ready_event = events.recv().await.ok_or_else(|| anyhow::anyhow!("stream ended"))?;
    assert_eq!(ready_event.kind, Some(DispatchKind::Ready));
    assert_eq!(ready_event.message_id, 1);

    let message_event = events.recv().await.ok_or_else(|| anyhow::anyhow!("stream ended"))?;
    assert_eq!(message_event.kind, Some(DispatchKind::GroupAtMessageCreate));
    assert_eq!(message_event.message_id, 2);
    assert_eq!(message_event.sequence, Some(2));
    assert_eq!(message_event.reply_route, Some(ReplyRoute::Group("GROUP1".into())));
    assert_eq!(message_event.message().map(|m| m.text().to_string()), Some("hello".into()));

    wait_until("reply", || !replies.lock().is_empty()).await?;
    assert_eq!(*replies.lock(), vec![true]);

    let requests = bed.platform.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/v2/groups/GROUP1/messages");
    assert_eq!(requests[0].authorization.as_deref(), Some("QQBot token-1"));
    assert_eq!(requests[0].app_id.as_deref(), Some(test_credentials().app_id.as_str()));
    assert_eq!(requests[0].body["content"], "pong");

    // In-band Reconnect only reaches handlers
    conn.send(reconnect()).await?;
    wait_until("reconnect handler", || *reconnects.lock() == 1).await?;
    assert_eq!(bed.gateway.accepted(), 1);
    assert_eq!(handle.phase(), SessionPhase::Ready);

    // Outbound frames go straight out while the socket is open
    handle.send_frame(&GatewayFrame::heartbeat(Some(99))).await?;
    loop {
        let heartbeat = conn.recv_op(1).await?;
        if heartbeat["d"] == 99 {
            break;
        }
    }

    handle.shutdown();
    run.await??;
    Ok(())
}

// ============================================================================
// Token provider and REST
// ============================================================================

#[tokio::test]
async fn test_token_is_cached_until_forced() -> Result<()> {
    let bed = TestBed::start().await?;
    let tokens = TokenProvider::new(bed.http_client()?, bed.platform.auth_url(), test_credentials());

    assert!(tokens.current().is_none());

    let first = tokens.get_token(false).await?;
    let second = tokens.get_token(false).await?;
    assert_eq!(first.value, "token-1");
    assert_eq!(second.value, "token-1");
    assert_eq!(bed.platform.token_calls(), 1);
    assert!(!first.is_expired());

    let forced = tokens.get_token(true).await?;
    assert_eq!(forced.value, "token-2");
    assert_eq!(bed.platform.token_calls(), 2);
    assert_eq!(tokens.current().map(|t| t.value), Some("token-2".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_token_requests_share_one_refresh() -> Result<()> {
    let bed = TestBed::start().await?;
    let tokens = Arc::new(TokenProvider::new(
        bed.http_client()?,
        bed.platform.auth_url(),
        test_credentials(),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.get_token(false).await })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await??.value, "token-1");
    }
    assert_eq!(bed.platform.token_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rest_request_results() -> Result<()> {
    let bed = TestBed::start().await?;
    let http = bed.http_client()?;
    let tokens = Arc::new(TokenProvider::new(http.clone(), bed.platform.auth_url(), test_credentials()));
    let sender = RequestSender::new(http, bed.platform.base_url(), Arc::clone(&tokens));

    // No token issued yet; the call is not attempted
    let err = sender.send_request("/v2/users/U1/messages", &json!({})).await.unwrap_err();
    assert!(matches!(err, RequestError::NoToken));
    assert!(bed.platform.requests().is_empty());

    tokens.get_token(false).await?;

    let body = sender
        .send_request("/v2/users/U1/messages", &json!({ "content": "hi", "msg_type": 0 }))
        .await?;
    assert_eq!(body["id"], "reply-1");

    let err = sender
        .send_request("/fail/messages", &json!({ "content": "hi" }))
        .await
        .unwrap_err();
    match err {
        RequestError::Status {
            status,
            code,
            message,
            trace_id,
        } => {
            assert_eq!(status, 400);
            assert_eq!(code, Some(11255));
            assert_eq!(message, "invalid request");
            assert_eq!(trace_id.as_deref(), Some(FAILING_TRACE_ID));
        }
        other => panic!("expected a status error, got {other:?}"),
    }

    // A failed call does not poison the sender
    assert!(sender.send_request("/v2/users/U1/messages", &json!({})).await.is_ok());
    assert_eq!(bed.platform.requests().len(), 3);
    Ok(())
}
