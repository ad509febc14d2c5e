//! Session configuration

use crate::protocol::{IdentifyProperties, Intents};
use qqbot_common::{BotConfig, Credentials};
use std::time::Duration;

/// Everything a [`GatewaySession`](super::GatewaySession) needs to run
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: Credentials,
    pub intents: Intents,
    pub identify_properties: IdentifyProperties,
    pub auth_url: String,
    pub api_base: String,
    /// Timeout for token, discovery and REST requests
    pub http_timeout: Duration,
    /// Taken off the token TTL so it is replaced before it lapses
    pub token_refresh_margin: Duration,
    /// Delay between Hello and the first heartbeat
    pub initial_heartbeat_delay: Duration,
    /// How often `send_frame` checks for a reopened socket
    pub send_poll_interval: Duration,
    /// How long `send_frame` waits for a reopened socket
    pub send_timeout: Duration,
    /// Capacity of each normalized event stream
    pub event_buffer: usize,
}

impl GatewayConfig {
    /// Production defaults for the given credentials
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self::from_bot_config(&BotConfig::new(credentials))
    }

    #[must_use]
    pub fn from_bot_config(config: &BotConfig) -> Self {
        Self {
            credentials: config.credentials.clone(),
            intents: Intents::resolve(config.intents, config.private),
            identify_properties: IdentifyProperties::default(),
            auth_url: config.network.auth_url.clone(),
            api_base: config.network.api_base.clone(),
            http_timeout: Duration::from_secs(config.network.http_timeout_secs),
            token_refresh_margin: Duration::from_secs(50),
            initial_heartbeat_delay: Duration::from_secs(1),
            send_poll_interval: Duration::from_secs(1),
            send_timeout: Duration::from_secs(config.network.send_timeout_secs),
            event_buffer: 256,
        }
    }

    #[must_use]
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
