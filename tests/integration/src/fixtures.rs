//! Gateway frame fixtures
//!
//! Server-to-client frames as the platform sends them.

use serde_json::{json, Value};

/// Session id handed out by [`ready`]
pub const SESSION_ID: &str = "abc123";

/// Heartbeat interval long enough that only the first heartbeat fires
pub const SLOW_HEARTBEAT_MS: u64 = 30_000;

pub fn ready(seq: u64) -> Value {
    ready_for(SESSION_ID, seq)
}

pub fn ready_for(session_id: &str, seq: u64) -> Value {
    json!({
        "op": 0,
        "s": seq,
        "t": "READY",
        "d": {
            "version": 1,
            "session_id": session_id,
            "user": { "id": "11586990140073229091", "username": "test-bot", "bot": true },
            "shard": [0, 1]
        }
    })
}

pub fn resumed(seq: u64) -> Value {
    json!({ "op": 0, "s": seq, "t": "RESUMED", "d": "" })
}

pub fn dispatch(t: &str, seq: u64, d: Value) -> Value {
    json!({ "op": 0, "s": seq, "t": t, "d": d })
}

pub fn group_at_message(seq: u64, content: &str) -> Value {
    dispatch(
        "GROUP_AT_MESSAGE_CREATE",
        seq,
        json!({
            "id": format!("ROBOT1.0_msg{seq}"),
            "content": content,
            "timestamp": "2024-05-01T12:00:00+08:00",
            "group_openid": "GROUP1",
            "author": { "member_openid": "MEMBER1" }
        }),
    )
}

pub fn heartbeat_ack() -> Value {
    json!({ "op": 11 })
}

pub fn reconnect() -> Value {
    json!({ "op": 7 })
}
