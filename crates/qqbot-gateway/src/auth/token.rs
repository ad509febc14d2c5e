//! Access token lifecycle
//!
//! Exchanges the application credentials for a short-lived bearer token and
//! caches it until shortly before it expires.

use crate::error::AuthError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use qqbot_common::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

/// Bearer credential with an absolute expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    /// Already pulled forward by the refresh margin
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token issued at `issued_at` that lives for `ttl_secs`, with
    /// `margin` shaved off the expiry so it is replaced before the platform
    /// starts rejecting it.
    #[must_use]
    pub fn issued(value: String, ttl_secs: i64, margin: Duration, issued_at: DateTime<Utc>) -> Self {
        let margin = ChronoDuration::from_std(margin).unwrap_or_else(|_| ChronoDuration::zero());
        Self {
            value,
            expires_at: issued_at + ChronoDuration::seconds(ttl_secs) - margin,
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    app_id: &'a str,
    client_secret: &'a str,
}

/// `expires_in` arrives as a string from the platform; accept both forms
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(i64),
    Text(String),
}

impl Seconds {
    fn value(&self) -> Result<i64, AuthError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AuthError::Malformed(format!("expires_in is not a number: {s:?}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Seconds>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl TokenResponse {
    fn into_token(self, margin: Duration, issued_at: DateTime<Utc>) -> Result<AccessToken, AuthError> {
        let value = match self.access_token {
            Some(value) if !value.is_empty() => value,
            _ => {
                return Err(AuthError::Malformed(format!(
                    "no access_token in response (code {:?}: {})",
                    self.code,
                    self.message.unwrap_or_default()
                )))
            }
        };

        let ttl = self
            .expires_in
            .ok_or_else(|| AuthError::Malformed("no expires_in in response".to_string()))?
            .value()?;

        Ok(AccessToken::issued(value, ttl, margin, issued_at))
    }
}

/// Fetches and caches the bot's access token
///
/// Safe to share between tasks. Refreshes are serialized so concurrent
/// non-forced callers that find the cache stale trigger a single request.
pub struct TokenProvider {
    http: reqwest::Client,
    auth_url: String,
    credentials: Credentials,
    refresh_margin: Duration,
    cached: parking_lot::RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    /// Default time taken off the platform's TTL
    pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(50);

    #[must_use]
    pub fn new(http: reqwest::Client, auth_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            auth_url: auth_url.into(),
            credentials,
            refresh_margin: Self::DEFAULT_REFRESH_MARGIN,
            cached: parking_lot::RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    /// Cached token, expired or not, without touching the network
    #[must_use]
    pub fn current(&self) -> Option<AccessToken> {
        self.cached.read().clone()
    }

    /// Return a valid token, requesting a new one when the cache is empty,
    /// expired, or `force` is set.
    pub async fn get_token(&self, force: bool) -> Result<AccessToken, AuthError> {
        if !force {
            if let Some(token) = self.fresh_cached() {
                return Ok(token);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited
        if !force {
            if let Some(token) = self.fresh_cached() {
                return Ok(token);
            }
        }

        let token = self.fetch().await?;
        *self.cached.write() = Some(token.clone());

        tracing::debug!(expires_at = %token.expires_at, "Access token refreshed");

        Ok(token)
    }

    fn fresh_cached(&self) -> Option<AccessToken> {
        self.cached
            .read()
            .as_ref()
            .filter(|token| !token.is_expired())
            .cloned()
    }

    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        let issued_at = Utc::now();

        let response = self
            .http
            .post(&self.auth_url)
            .json(&TokenRequest {
                app_id: &self.credentials.app_id,
                client_secret: &self.credentials.client_secret,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status, "Token endpoint rejected credentials");
            return Err(AuthError::Status { status, body });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        body.into_token(self.refresh_margin, issued_at)
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("auth_url", &self.auth_url)
            .field("credentials", &self.credentials)
            .field("refresh_margin", &self.refresh_margin)
            .finish()
    }
}
