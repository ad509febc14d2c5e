//! Dispatch payload definitions
//!
//! Typed views over the `d` field of message-bearing dispatch events. Fields
//! that only some event types carry are optional.

use serde::{Deserialize, Serialize};

/// Message sender
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAuthor {
    /// Guild user id (guild and direct messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Per-bot user id (one-to-one messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_openid: Option<String>,

    /// Per-group member id (group messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_openid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(default)]
    pub bot: bool,
}

impl MessageAuthor {
    /// Whichever id the event type populated
    #[must_use]
    pub fn any_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.user_openid.as_deref())
            .or(self.member_openid.as_deref())
    }
}

/// File or image attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAttachment {
    pub content_type: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl MessageAttachment {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image")
    }

    /// Attachment URL with a scheme; the platform sometimes omits it
    #[must_use]
    pub fn absolute_url(&self) -> String {
        if self.url.starts_with("http") {
            self.url.clone()
        } else {
            format!("http://{}", self.url)
        }
    }
}

/// Payload of a message-bearing dispatch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    /// Platform message id, needed to send a passive reply
    pub id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub author: MessageAuthor,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_openid: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<MessageAuthor>,
}

impl MessagePayload {
    /// Content with surrounding whitespace removed
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.trim()
    }
}
