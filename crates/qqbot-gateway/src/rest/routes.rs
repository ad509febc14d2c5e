//! Reply route derivation
//!
//! Maps an inbound dispatch to the REST resource a reply is posted under.

use serde_json::Value;
use std::fmt;

/// Conversation a dispatch belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyRoute {
    /// One-to-one chat, keyed by user openid
    User(String),
    /// Group chat, keyed by group openid
    Group(String),
    /// Guild direct message session, keyed by the DM guild id
    DirectMessage(String),
    /// Guild text channel
    Channel(String),
}

impl ReplyRoute {
    /// Derive the route from a dispatch event type and payload.
    ///
    /// `None` for event types that have no conversation or when the id field
    /// is missing.
    #[must_use]
    pub fn for_dispatch(event_type: &str, data: &Value) -> Option<Self> {
        let field = |pointer: &str| data.pointer(pointer).and_then(Value::as_str).map(str::to_string);

        match event_type {
            "C2C_MESSAGE_CREATE" => field("/author/user_openid").map(Self::User),
            "FRIEND_ADD" | "C2C_MSG_RECEIVE" => field("/openid").map(Self::User),
            "GROUP_AT_MESSAGE_CREATE" | "GROUP_MESSAGE_CREATE" | "GROUP_ADD_ROBOT"
            | "GROUP_MSG_RECEIVE" => field("/group_openid").map(Self::Group),
            "DIRECT_MESSAGE_CREATE" => field("/guild_id").map(Self::DirectMessage),
            "AT_MESSAGE_CREATE" | "MESSAGE_CREATE" => field("/channel_id").map(Self::Channel),
            _ => None,
        }
    }

    /// Resource path with a trailing slash, e.g. `/v2/groups/{id}/`
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::User(id) => format!("/v2/users/{id}/"),
            Self::Group(id) => format!("/v2/groups/{id}/"),
            Self::DirectMessage(id) => format!("/dms/{id}/"),
            Self::Channel(id) => format!("/channels/{id}/"),
        }
    }

    /// Path for posting a message to this conversation
    #[must_use]
    pub fn messages_path(&self) -> String {
        format!("{}messages", self.path())
    }

    /// Path for uploading rich media; only user and group chats have one
    #[must_use]
    pub fn files_path(&self) -> Option<String> {
        match self {
            Self::User(_) | Self::Group(_) => Some(format!("{}files", self.path())),
            Self::DirectMessage(_) | Self::Channel(_) => None,
        }
    }
}

impl fmt::Display for ReplyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
