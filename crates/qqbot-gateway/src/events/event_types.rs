//! Dispatch event types
//!
//! Names carried in the `t` field of Dispatch frames.

use crate::protocol::Intents;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Known dispatch event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchKind {
    // Session
    /// Sent after a successful Identify
    Ready,
    /// Sent after a successful Resume
    Resumed,

    // Guilds and channels
    GuildCreate,
    GuildUpdate,
    GuildDelete,
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,

    // Guild messages
    /// Any guild message (private bots)
    MessageCreate,
    MessageDelete,
    /// Guild message that @-mentions the bot
    AtMessageCreate,
    PublicMessageDelete,
    DirectMessageCreate,
    DirectMessageDelete,
    MessageReactionAdd,
    MessageReactionRemove,

    // Groups and one-to-one chats
    C2cMessageCreate,
    GroupAtMessageCreate,
    GroupMessageCreate,
    FriendAdd,
    FriendDel,
    C2cMsgReject,
    C2cMsgReceive,
    GroupAddRobot,
    GroupDelRobot,
    GroupMsgReject,
    GroupMsgReceive,

    // Other
    InteractionCreate,
    MessageAuditPass,
    MessageAuditReject,
}

impl DispatchKind {
    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::AtMessageCreate => "AT_MESSAGE_CREATE",
            Self::PublicMessageDelete => "PUBLIC_MESSAGE_DELETE",
            Self::DirectMessageCreate => "DIRECT_MESSAGE_CREATE",
            Self::DirectMessageDelete => "DIRECT_MESSAGE_DELETE",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::C2cMessageCreate => "C2C_MESSAGE_CREATE",
            Self::GroupAtMessageCreate => "GROUP_AT_MESSAGE_CREATE",
            Self::GroupMessageCreate => "GROUP_MESSAGE_CREATE",
            Self::FriendAdd => "FRIEND_ADD",
            Self::FriendDel => "FRIEND_DEL",
            Self::C2cMsgReject => "C2C_MSG_REJECT",
            Self::C2cMsgReceive => "C2C_MSG_RECEIVE",
            Self::GroupAddRobot => "GROUP_ADD_ROBOT",
            Self::GroupDelRobot => "GROUP_DEL_ROBOT",
            Self::GroupMsgReject => "GROUP_MSG_REJECT",
            Self::GroupMsgReceive => "GROUP_MSG_RECEIVE",
            Self::InteractionCreate => "INTERACTION_CREATE",
            Self::MessageAuditPass => "MESSAGE_AUDIT_PASS",
            Self::MessageAuditReject => "MESSAGE_AUDIT_REJECT",
        }
    }

    /// Parse an event type from a string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "AT_MESSAGE_CREATE" => Some(Self::AtMessageCreate),
            "PUBLIC_MESSAGE_DELETE" => Some(Self::PublicMessageDelete),
            "DIRECT_MESSAGE_CREATE" => Some(Self::DirectMessageCreate),
            "DIRECT_MESSAGE_DELETE" => Some(Self::DirectMessageDelete),
            "MESSAGE_REACTION_ADD" => Some(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::MessageReactionRemove),
            "C2C_MESSAGE_CREATE" => Some(Self::C2cMessageCreate),
            "GROUP_AT_MESSAGE_CREATE" => Some(Self::GroupAtMessageCreate),
            "GROUP_MESSAGE_CREATE" => Some(Self::GroupMessageCreate),
            "FRIEND_ADD" => Some(Self::FriendAdd),
            "FRIEND_DEL" => Some(Self::FriendDel),
            "C2C_MSG_REJECT" => Some(Self::C2cMsgReject),
            "C2C_MSG_RECEIVE" => Some(Self::C2cMsgReceive),
            "GROUP_ADD_ROBOT" => Some(Self::GroupAddRobot),
            "GROUP_DEL_ROBOT" => Some(Self::GroupDelRobot),
            "GROUP_MSG_REJECT" => Some(Self::GroupMsgReject),
            "GROUP_MSG_RECEIVE" => Some(Self::GroupMsgReceive),
            "INTERACTION_CREATE" => Some(Self::InteractionCreate),
            "MESSAGE_AUDIT_PASS" => Some(Self::MessageAuditPass),
            "MESSAGE_AUDIT_REJECT" => Some(Self::MessageAuditReject),
            _ => None,
        }
    }

    /// Whether the event carries a chat message
    #[must_use]
    pub const fn is_message(self) -> bool {
        matches!(
            self,
            Self::MessageCreate
                | Self::AtMessageCreate
                | Self::DirectMessageCreate
                | Self::C2cMessageCreate
                | Self::GroupAtMessageCreate
                | Self::GroupMessageCreate
        )
    }

    /// Intent that must be identified with to receive this event; `None` for
    /// session events that every bot receives.
    #[must_use]
    pub fn required_intent(self) -> Option<Intents> {
        match self {
            Self::Ready | Self::Resumed => None,
            Self::GuildCreate
            | Self::GuildUpdate
            | Self::GuildDelete
            | Self::ChannelCreate
            | Self::ChannelUpdate
            | Self::ChannelDelete => Some(Intents::GUILDS),
            Self::GuildMemberAdd | Self::GuildMemberUpdate | Self::GuildMemberRemove => {
                Some(Intents::GUILD_MEMBERS)
            }
            Self::MessageCreate | Self::MessageDelete => Some(Intents::GUILD_MESSAGES),
            Self::AtMessageCreate | Self::PublicMessageDelete => Some(Intents::PUBLIC_GUILD_MESSAGES),
            Self::DirectMessageCreate | Self::DirectMessageDelete => Some(Intents::DIRECT_MESSAGE),
            Self::MessageReactionAdd | Self::MessageReactionRemove => {
                Some(Intents::GUILD_MESSAGE_REACTIONS)
            }
            Self::C2cMessageCreate
            | Self::GroupAtMessageCreate
            | Self::GroupMessageCreate
            | Self::FriendAdd
            | Self::FriendDel
            | Self::C2cMsgReject
            | Self::C2cMsgReceive
            | Self::GroupAddRobot
            | Self::GroupDelRobot
            | Self::GroupMsgReject
            | Self::GroupMsgReceive => Some(Intents::GROUP_AND_C2C_EVENT),
            Self::InteractionCreate => Some(Intents::INTERACTION),
            Self::MessageAuditPass | Self::MessageAuditReject => Some(Intents::MESSAGE_AUDIT),
        }
    }
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<DispatchKind> for String {
    fn from(kind: DispatchKind) -> Self {
        kind.as_str().to_string()
    }
}
