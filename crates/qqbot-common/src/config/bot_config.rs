//! Bot configuration structs
//!
//! Loads configuration from environment variables (and an optional `.env` file).

use serde::Deserialize;
use std::env;
use std::fmt;

/// Token endpoint used when `BOT_AUTH_URL` is not set
pub const DEFAULT_AUTH_URL: &str = "https://bots.qq.com/app/getAppAccessToken";

/// Production REST host
pub const DEFAULT_API_BASE: &str = "https://api.sgroup.qq.com";

/// Sandbox REST host
pub const SANDBOX_API_BASE: &str = "https://sandbox.api.sgroup.qq.com";

/// Main bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub env: Environment,
    /// Private-domain bots receive full guild message events
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub sandbox: bool,
    /// Explicit intents bitmask; derived from `private` when absent
    #[serde(default)]
    pub intents: Option<u32>,
    pub network: NetworkConfig,
}

/// Application credentials exchanged for an access token
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub app_id: String,
    pub client_secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(app_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Remote endpoints and network timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    pub api_base: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Upper bound for waiting on a reconnecting socket before a send fails
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl NetworkConfig {
    /// Network settings for the production or sandbox platform
    #[must_use]
    pub fn for_platform(sandbox: bool) -> Self {
        Self {
            auth_url: default_auth_url(),
            api_base: default_api_base(sandbox),
            http_timeout_secs: default_http_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

// Default value functions
fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_api_base(sandbox: bool) -> String {
    if sandbox {
        SANDBOX_API_BASE.to_string()
    } else {
        DEFAULT_API_BASE.to_string()
    }
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_send_timeout_secs() -> u64 {
    30
}

impl BotConfig {
    /// Build a configuration for the given credentials with every other value defaulted
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            env: Environment::default(),
            private: false,
            sandbox: false,
            intents: None,
            network: NetworkConfig::for_platform(false),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sandbox = parse_flag(&lookup, "BOT_SANDBOX")?;

        let config = Self {
            credentials: Credentials {
                app_id: lookup("BOT_APP_ID").ok_or(ConfigError::MissingVar("BOT_APP_ID"))?,
                client_secret: lookup("BOT_CLIENT_SECRET")
                    .ok_or(ConfigError::MissingVar("BOT_CLIENT_SECRET"))?,
            },
            env: match lookup("BOT_ENV") {
                Some(raw) => Environment::parse(&raw)
                    .ok_or(ConfigError::InvalidValue("BOT_ENV", raw))?,
                None => Environment::default(),
            },
            private: parse_flag(&lookup, "BOT_PRIVATE")?,
            sandbox,
            intents: parse_number(&lookup, "BOT_INTENTS")?,
            network: NetworkConfig {
                auth_url: lookup("BOT_AUTH_URL").unwrap_or_else(default_auth_url),
                api_base: lookup("BOT_API_BASE").unwrap_or_else(|| default_api_base(sandbox)),
                http_timeout_secs: parse_number(&lookup, "BOT_HTTP_TIMEOUT_SECS")?
                    .unwrap_or_else(default_http_timeout_secs),
                send_timeout_secs: parse_number(&lookup, "BOT_SEND_TIMEOUT_SECS")?
                    .unwrap_or_else(default_send_timeout_secs),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.app_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("BOT_APP_ID", "must not be empty".to_string()));
        }

        if self.credentials.client_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "BOT_CLIENT_SECRET",
                "must not be empty".to_string(),
            ));
        }

        if !self.network.api_base.starts_with("http://") && !self.network.api_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BOT_API_BASE",
                format!("expected an http(s) URL, got {}", self.network.api_base),
            ));
        }

        if self.network.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "BOT_HTTP_TIMEOUT_SECS",
                "must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key, raw)),
        },
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key, raw)))
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
