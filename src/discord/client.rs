//! Discord bot client abstraction.
//!
//! Provides a high-level interface for creating and running the Discord bot,
//! hiding serenity implementation details from the rest of the application.
//! Gateway events for the watched guild are translated into `PlatformEvent`s.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use serenity::all::{GuildId, Presence, Ready, VoiceState};
use serenity::async_trait;
use serenity::prelude::*;
use serenity::Client;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::common::PlatformEvent;
use crate::discord::platform::{SerenityPlatform, Session};
use crate::discord::snapshot::voice_state_snapshot;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

/// Forwards gateway events for one guild to the bridge.
struct DiscordBotEvents {
    guild_id: GuildId,
    platform: Arc<SerenityPlatform>,
    platform_tx: mpsc::UnboundedSender<PlatformEvent>,
}

impl DiscordBotEvents {
    fn send(&self, event: PlatformEvent) {
        if let Err(error) = self.platform_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBotEvents {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord gateway ready as {}", ready.user.name);
        self.platform
            .install_session(Session {
                http: ctx.http.clone(),
                cache: ctx.cache.clone(),
                shard: ctx.shard.clone(),
            })
            .await;
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        if !guilds.contains(&self.guild_id) {
            warn!(
                guild_id = self.guild_id.get(),
                "Bot is not a member of the configured guild"
            );
        }

        let (bot_id, bot_name) = {
            let user = ctx.cache.current_user();
            (user.id.get(), user.name.clone())
        };
        self.send(PlatformEvent::Ready { bot_id, bot_name });
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        if new.guild_id != Some(self.guild_id) {
            return;
        }

        let (old, new) = {
            let guild = ctx.cache.guild(self.guild_id);
            let guild = guild.as_deref();
            (
                old.as_ref().map(|state| voice_state_snapshot(state, guild)),
                voice_state_snapshot(&new, guild),
            )
        };
        debug!(user_id = new.user_id, channel_id = ?new.channel_id, "Voice state update");
        self.send(PlatformEvent::VoiceStateUpdate { old, new });
    }

    async fn presence_update(&self, _ctx: Context, presence: Presence) {
        if presence.guild_id != Some(self.guild_id) {
            return;
        }
        self.send(PlatformEvent::PresenceUpdate {
            user_id: presence.user.id.get(),
        });
    }
}

/// Builder for creating the Discord bot.
pub struct DiscordBotBuilder {
    token: String,
    platform: Arc<SerenityPlatform>,
    platform_tx: mpsc::UnboundedSender<PlatformEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBotBuilder {
    pub fn new(
        token: String,
        platform: Arc<SerenityPlatform>,
        platform_tx: mpsc::UnboundedSender<PlatformEvent>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            token,
            platform,
            platform_tx,
            shutdown_rx,
        }
    }

    /// Build the Discord bot.
    pub async fn build(self) -> anyhow::Result<DiscordBot> {
        let client = build_client(&self.token, &self.platform, &self.platform_tx).await?;
        Ok(DiscordBot {
            client: Some(client),
            token: self.token,
            platform: self.platform,
            platform_tx: self.platform_tx,
            shutdown_rx: self.shutdown_rx,
        })
    }
}

async fn build_client(
    token: &str,
    platform: &Arc<SerenityPlatform>,
    platform_tx: &mpsc::UnboundedSender<PlatformEvent>,
) -> anyhow::Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_PRESENCES
        | GatewayIntents::GUILD_VOICE_STATES;

    let events = DiscordBotEvents {
        guild_id: platform.guild_id(),
        platform: platform.clone(),
        platform_tx: platform_tx.clone(),
    };
    let client = Client::builder(token, intents).event_handler(events).await?;
    Ok(client)
}

/// Exponential backoff for Discord client restarts.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn discord_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

pub struct DiscordBot {
    client: Option<Client>,
    token: String,
    platform: Arc<SerenityPlatform>,
    platform_tx: mpsc::UnboundedSender<PlatformEvent>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DiscordBot {
    pub async fn run(mut self) {
        let shard_manager = self.client.as_ref().map(|c| c.shard_manager.clone());
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::select! {
            _ = Self::run_connection(&mut self.client, &self.token, &self.platform, &self.platform_tx) => {},
            _ = async {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                if let Some(ref manager) = shard_manager {
                    info!("Initiating graceful Discord shutdown...");
                    manager.shutdown_all().await;
                    info!("Discord shutdown complete");
                }
            } => {}
        }
        info!("Discord task ended");
    }

    async fn run_connection(
        client: &mut Option<Client>,
        token: &str,
        platform: &Arc<SerenityPlatform>,
        platform_tx: &mpsc::UnboundedSender<PlatformEvent>,
    ) {
        let mut backoff = discord_backoff();

        loop {
            info!("Connecting to Discord...");

            let mut client = match client.take() {
                Some(client) => client,
                None => {
                    // serenity mostly handles reconnections itself.
                    match build_client(token, platform, platform_tx).await {
                        Ok(client) => {
                            backoff = discord_backoff();
                            client
                        }
                        Err(e) => {
                            error!("Failed to rebuild Discord client: {}", e);
                            let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                            warn!("Retrying in {:.1}s...", delay.as_secs_f64());
                            sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            let result = client.start().await;
            if let Err(error) = platform_tx.send(PlatformEvent::Disconnected) {
                debug!("Platform event channel closed: {}", error);
            }

            match result {
                Ok(()) => {
                    info!("Discord client disconnected normally");
                    break;
                }
                Err(e) => {
                    error!("Discord client error: {}", e);
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Discord disconnected. Reconnecting in {:.1}s...",
                        delay.as_secs_f64(),
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
