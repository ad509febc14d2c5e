//! Gateway intents
//!
//! Event groups a bot subscribes to in Identify, encoded as a 32-bit mask.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Event subscription flags sent with Identify
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u32 {
        /// Guild create/update/delete, channel create/update/delete
        const GUILDS                  = 1 << 0;
        /// Guild member add/update/remove
        const GUILD_MEMBERS           = 1 << 1;
        /// Every guild message (private bots only)
        const GUILD_MESSAGES          = 1 << 9;
        /// Message reaction add/remove
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        /// Direct messages
        const DIRECT_MESSAGE          = 1 << 12;
        /// Group and C2C messages, friend and group membership changes
        const GROUP_AND_C2C_EVENT     = 1 << 25;
        /// Button interactions
        const INTERACTION             = 1 << 26;
        /// Message audit results
        const MESSAGE_AUDIT           = 1 << 27;
        /// Forum threads and posts (private bots only)
        const FORUMS_EVENT            = 1 << 28;
        /// Audio playback events
        const AUDIO_ACTION            = 1 << 29;
        /// Guild messages that @-mention the bot
        const PUBLIC_GUILD_MESSAGES   = 1 << 30;

        /// Default subscription for public-domain bots
        const PUBLIC_DEFAULT = Self::GUILDS.bits() | Self::PUBLIC_GUILD_MESSAGES.bits();

        /// Default subscription for private-domain bots
        const PRIVATE_DEFAULT = Self::GUILDS.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::FORUMS_EVENT.bits();
    }
}

impl Intents {
    /// Default subscription for a bot of the given visibility
    #[must_use]
    pub fn for_bot(private: bool) -> Self {
        if private {
            Self::PRIVATE_DEFAULT
        } else {
            Self::PUBLIC_DEFAULT
        }
    }

    /// Resolve the intents to identify with: an explicit mask wins, otherwise
    /// the default for the bot's visibility.
    #[must_use]
    pub fn resolve(explicit: Option<u32>, private: bool) -> Self {
        match explicit {
            Some(bits) => Self::from_bits_retain(bits),
            None => Self::for_bot(private),
        }
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::PUBLIC_DEFAULT
    }
}

impl fmt::Display for Intents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.bits())
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits_retain(bits))
    }
}

impl From<Intents> for u32 {
    fn from(intents: Intents) -> Self {
        intents.bits()
    }
}
