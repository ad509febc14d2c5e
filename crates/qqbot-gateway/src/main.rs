//! QQ bot gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p qqbot-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use anyhow::Context;
use qqbot_common::{
    try_init_tracing_with_config, BotConfig, ConfigError, Environment, TracingConfig,
};
use qqbot_gateway::{GatewayConfig, GatewaySession, PassthroughConsumer};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Config decides the log format, so it is read before tracing starts
    let config = BotConfig::from_env();
    let env = config.as_ref().map_or(Environment::default(), |c| c.env);

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = format!("{e:#}"), "Gateway session ended with an error");
        std::process::exit(1);
    }
}

async fn run(config: Result<BotConfig, ConfigError>) -> anyhow::Result<()> {
    info!("Starting QQ bot gateway...");

    let config = config.map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        app_id = %config.credentials.app_id,
        env = ?config.env,
        private = config.private,
        sandbox = config.sandbox,
        "Configuration loaded"
    );

    let session = GatewaySession::new(GatewayConfig::from_bot_config(&config))
        .context("failed to build gateway session")?;
    let handle = session.handle();

    let mut events = handle.subscribe(PassthroughConsumer);
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(
                message_id = event.message_id,
                t = %event.event_type,
                seq = ?event.sequence,
                route = ?event.reply_route.as_ref().map(ToString::to_string),
                "Event received"
            );
        }
    });

    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            shutdown_handle.shutdown();
        }
    });

    session.run().await.context("gateway session failed")?;

    info!("Gateway stopped");
    Ok(())
}
