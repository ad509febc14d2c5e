//! Configuration structs

mod bot_config;

pub use bot_config::{BotConfig, ConfigError, Credentials, Environment, NetworkConfig};
