//! hass-discord-bridge - Discord voice and presence bridge for Home Assistant
//!
//! Mirrors one guild member's voice state and the guild's presence onto MQTT,
//! publishes Home Assistant discovery for it, and applies commands sent back
//! over MQTT to the member and the bot.

mod bridge;
mod common;
mod config;
mod discord;
mod mqtt;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{debug, error, info, warn};

use bridge::{BridgeController, ChannelBundle};
use config::{env::get_config_path, load_and_validate};
use discord::{DiscordBotBuilder, SerenityPlatform};
use mqtt::MqttBus;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("hass-discord-bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Provide {} or the HASS_DISCORD_* environment variables.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Guild: {}", config.discord.guild_id);
    info!("  Watched user: {}", config.discord.watched_user_id);
    info!("  MQTT broker: {}:{}", config.mqtt.host, config.mqtt.port);
    info!("  Base topic: {}", config.topics.base);
    info!("  Discovery prefix: {}", config.topics.discovery);

    let config = Arc::new(config);
    let channels = ChannelBundle::new();

    // ============================================================
    // Connect both sides
    // ============================================================
    let platform = Arc::new(SerenityPlatform::new(config.discord.guild_id));
    let (bus, mqtt_task) = MqttBus::connect(&config, channels.senders.bus_tx.clone());
    let bus = Arc::new(bus);

    let discord_bot = DiscordBotBuilder::new(
        config.discord.token.clone(),
        platform.clone(),
        channels.senders.platform_tx.clone(),
        channels.controller.shutdown_rx.clone(),
    )
    .build()
    .await?;

    info!("Starting Discord bot...");
    let mut discord_task = tokio::spawn(discord_bot.run());

    let controller = BridgeController::new(config.clone(), platform, bus.clone());
    let mut controller_task = tokio::spawn(controller.run(
        channels.controller.platform_rx,
        channels.controller.bus_rx,
        channels.controller.shutdown_rx,
    ));

    // ============================================================
    // Run until a signal or a task exits
    // ============================================================
    let shutdown_tx = channels.control.shutdown_tx;
    let (discord_running, controller_running) = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - shutting down...");
            (true, true)
        }
        _ = &mut discord_task => {
            warn!("Discord task exited");
            (false, true)
        }
        _ = &mut controller_task => {
            warn!("Bridge controller exited");
            (true, false)
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    // The controller publishes connected=false on its way out
    if controller_running {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, controller_task).await {
            Ok(Ok(())) => info!("Bridge controller stopped"),
            Ok(Err(e)) => warn!("Bridge controller task failed: {}", e),
            Err(_) => warn!("Bridge controller shutdown timed out"),
        }
    }

    if let Err(e) = bus.disconnect().await {
        warn!("Failed to disconnect from MQTT broker: {}", e);
    }
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, mqtt_task).await.is_err() {
        warn!("MQTT disconnect timed out");
    }
    if discord_running && tokio::time::timeout(SHUTDOWN_TIMEOUT, discord_task).await.is_err() {
        warn!("Discord shutdown timed out");
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
