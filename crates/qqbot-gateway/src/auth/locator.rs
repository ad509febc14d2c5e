//! Gateway discovery
//!
//! Resolves the websocket endpoint and the session-start quota.

use super::{authorize, AccessToken};
use crate::error::{DiscoveryError, GatewayError};
use serde::Deserialize;

/// Discovery path under the REST base
pub const GATEWAY_BOT_PATH: &str = "/gateway/bot";

/// Websocket endpoint plus session-start quota
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayDescriptor {
    pub url: String,

    /// Recommended shard count; only a single shard is ever used
    #[serde(default = "default_shards")]
    pub shards: u32,

    pub session_start_limit: SessionStartLimit,
}

/// How many more sessions may be started before the quota resets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionStartLimit {
    pub total: i64,
    pub remaining: i64,
    /// Milliseconds until `remaining` resets to `total`
    pub reset_after: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
}

fn default_shards() -> u32 {
    1
}

fn default_max_concurrency() -> u32 {
    1
}

impl GatewayDescriptor {
    /// Fail with `SessionLimitExceeded` when no session may be started
    pub fn check_quota(&self) -> Result<(), GatewayError> {
        let limit = self.session_start_limit;
        if limit.remaining < 1 {
            return Err(GatewayError::SessionLimitExceeded {
                remaining: limit.remaining,
                reset_after: limit.reset_after,
            });
        }
        Ok(())
    }
}

/// Looks up the gateway endpoint for the bot
#[derive(Debug, Clone)]
pub struct GatewayLocator {
    http: reqwest::Client,
    api_base: String,
    app_id: String,
}

impl GatewayLocator {
    #[must_use]
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }

    /// GET `/gateway/bot` with the given token. Not retried.
    pub async fn resolve_gateway(&self, token: &AccessToken) -> Result<GatewayDescriptor, DiscoveryError> {
        let url = format!("{}{GATEWAY_BOT_PATH}", self.api_base);
        let builder = authorize(self.http.get(&url), &token.value, &self.app_id);

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status { status, body });
        }

        let descriptor: GatewayDescriptor = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        tracing::debug!(
            url = %descriptor.url,
            shards = descriptor.shards,
            remaining = descriptor.session_start_limit.remaining,
            "Gateway resolved"
        );

        Ok(descriptor)
    }
}
