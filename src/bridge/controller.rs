//! Bridge controller.
//!
//! Owns the dispatch loop: platform and bus events arrive on two channels and
//! are handled one at a time. State publishes happen inline; inbound commands
//! are spawned so a slow Discord call never holds up the loop.

use std::sync::Arc;

use rumqttc::QoS;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::commands::{log_result, CommandInterpreter};
use crate::bridge::discovery::build_discovery_components;
use crate::bridge::ports::{ChatPlatform, MessageBus};
use crate::bridge::projector::{
    project_membership, project_presence, project_voice_state, VoiceStatus,
};
use crate::common::error::BusError;
use crate::common::types::GuildSnapshot;
use crate::common::{BusEvent, PlatformEvent, VoiceStateSnapshot};
use crate::config::types::BridgeConfig;
use crate::discord::invite_url;

/// Custom status the bot shows after login.
pub const DEFAULT_ACTIVITY: &str = "🏠 Watching the house";

const HUB_ONLINE: &str = "online";

pub struct BridgeController<P, B> {
    config: Arc<BridgeConfig>,
    platform: Arc<P>,
    bus: Arc<B>,
    interpreter: Arc<CommandInterpreter<P, B>>,
    bus_connected: bool,
    /// Discovery could not be built yet (no guild data).
    discovery_pending: bool,
}

impl<P: ChatPlatform, B: MessageBus> BridgeController<P, B> {
    pub fn new(config: Arc<BridgeConfig>, platform: Arc<P>, bus: Arc<B>) -> Self {
        let interpreter = Arc::new(CommandInterpreter::new(
            platform.clone(),
            bus.clone(),
            config.watched_user_id(),
            config.topics.activity.clone(),
        ));

        Self {
            config,
            platform,
            bus,
            interpreter,
            bus_connected: false,
            discovery_pending: false,
        }
    }

    /// Run until shutdown is signalled or an event source goes away.
    pub async fn run(
        mut self,
        mut platform_rx: mpsc::UnboundedReceiver<PlatformEvent>,
        mut bus_rx: mpsc::UnboundedReceiver<BusEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        info!("Bridge controller started");

        loop {
            tokio::select! {
                // Drain queued events before honoring shutdown
                biased;

                event = bus_rx.recv() => match event {
                    Some(event) => {
                        self.handle_bus_event(event).await;
                    }
                    None => {
                        info!("Bus event channel closed");
                        break;
                    }
                },

                event = platform_rx.recv() => match event {
                    Some(event) => self.handle_platform_event(event).await,
                    None => {
                        info!("Platform event channel closed");
                        break;
                    }
                },

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping bridge controller");
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
    }

    pub async fn handle_platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Ready { bot_id, bot_name } => self.on_platform_ready(bot_id, &bot_name).await,
            PlatformEvent::VoiceStateUpdate { old, new } => {
                self.on_voice_state_update(old.as_ref(), &new).await
            }
            PlatformEvent::PresenceUpdate { user_id } => {
                debug!(user_id, "Presence updated");
                self.publish_presence().await;
            }
            PlatformEvent::Disconnected => warn!("Discord gateway disconnected"),
        }
    }

    /// Handle a bus event. Returns the task running an inbound command, if one was spawned.
    pub async fn handle_bus_event(&mut self, event: BusEvent) -> Option<JoinHandle<()>> {
        match event {
            BusEvent::Connected => {
                self.on_bus_connected().await;
                None
            }
            BusEvent::Message { topic, payload } => self.on_bus_message(&topic, payload).await,
            BusEvent::Disconnected(reason) => {
                if self.bus_connected {
                    warn!("MQTT connection lost: {}", reason);
                } else {
                    debug!("MQTT still disconnected: {}", reason);
                }
                self.bus_connected = false;
                None
            }
        }
    }

    async fn on_bus_connected(&mut self) {
        info!("Connected to MQTT broker");
        self.bus_connected = true;
        let topics = &self.config.topics;

        for topic in [&topics.command, &topics.hub_status] {
            if let Err(e) = self.bus.subscribe(topic, QoS::AtLeastOnce).await {
                error!(topic = %topic, "Failed to subscribe: {}", e);
            }
        }

        let connected = topics.connected.clone();
        self.publish_logged(&connected, QoS::AtLeastOnce, true, b"true".to_vec())
            .await;

        self.publish_watched_voice().await;
        self.publish_guild_state().await;
    }

    async fn on_bus_message(&mut self, topic: &str, payload: String) -> Option<JoinHandle<()>> {
        let topics = &self.config.topics;

        if topic == topics.command {
            debug!(command = %payload, "Received command");
            let interpreter = self.interpreter.clone();
            return Some(tokio::spawn(async move {
                interpreter.handle(&payload).await;
            }));
        }

        if topic == topics.hub_status {
            if payload == HUB_ONLINE {
                info!("Home Assistant came online, republishing discovery");
                self.publish_discovery().await;
            } else {
                debug!(status = %payload, "Home Assistant status changed");
            }
            return None;
        }

        debug!(topic, "Ignoring message on unexpected topic");
        None
    }

    async fn on_platform_ready(&mut self, bot_id: u64, bot_name: &str) {
        info!(bot_id, "Logged in to Discord as {}", bot_name);
        info!("Invite link: {}", invite_url(bot_id));

        if let Err(e) = self.platform.set_activity(DEFAULT_ACTIVITY).await {
            warn!("Failed to set bot activity: {}", e);
        }

        let nickname = self.config.discord.nickname.clone();
        let result = self.interpreter.set_bot_nickname(&nickname).await;
        log_result(&format!("bot_nick {}", nickname), &result);

        self.publish_watched_voice().await;

        if self.discovery_pending && self.bus_connected {
            info!("Guild data available, running deferred discovery");
            self.publish_guild_state().await;
        }
    }

    async fn on_voice_state_update(&self, old: Option<&VoiceStateSnapshot>, new: &VoiceStateSnapshot) {
        if let Some(status) = project_voice_state(self.config.watched_user_id(), old, new) {
            debug!(connected = status.is_connected(), "Watched member voice state changed");
            self.publish_voice_status(&status).await;
        }
        self.publish_membership().await;
    }

    /// Publish `connected=false` before a clean exit.
    pub async fn shutdown(&self) {
        if !self.bus_connected {
            return;
        }
        let connected = self.config.topics.connected.clone();
        self.publish_logged(&connected, QoS::AtLeastOnce, true, b"false".to_vec())
            .await;
    }

    /// Discovery, presence and membership from one guild snapshot.
    async fn publish_guild_state(&mut self) {
        match self.platform.guild_snapshot().await {
            Ok(guild) => {
                self.publish_discovery_for(&guild).await;
                self.publish_presence_for(&guild).await;
                self.publish_membership_for(&guild).await;
            }
            Err(e) => {
                warn!("Guild data not available yet, deferring discovery: {}", e);
                self.discovery_pending = true;
            }
        }
    }

    async fn publish_discovery(&mut self) {
        match self.platform.guild_snapshot().await {
            Ok(guild) => self.publish_discovery_for(&guild).await,
            Err(e) => {
                warn!("Guild data not available yet, deferring discovery: {}", e);
                self.discovery_pending = true;
            }
        }
    }

    async fn publish_discovery_for(&mut self, guild: &GuildSnapshot) {
        let components = build_discovery_components(&self.config, &guild.voice_channel_names());
        let mut published = 0;

        for component in &components {
            let payload = match component.to_json() {
                Ok(payload) => payload,
                Err(e) => {
                    error!(topic = %component.topic, "Failed to encode discovery payload: {}", e);
                    continue;
                }
            };
            if self
                .publish_logged(&component.topic, QoS::AtLeastOnce, false, payload.into_bytes())
                .await
            {
                published += 1;
            }
        }

        self.discovery_pending = false;
        info!("Published {}/{} discovery entities", published, components.len());
    }

    async fn publish_watched_voice(&self) {
        let user_id = self.config.watched_user_id();
        match self.platform.member_voice(user_id).await {
            Ok(state) => {
                self.publish_voice_status(&VoiceStatus::from_voice_state(&state))
                    .await
            }
            Err(e) => warn!(user_id, "Could not read watched member voice state: {}", e),
        }
    }

    async fn publish_voice_status(&self, status: &VoiceStatus) {
        let (qos, retain) = if status.is_connected() {
            (QoS::AtLeastOnce, true)
        } else {
            (QoS::AtMostOnce, false)
        };
        self.publish_json(&self.config.topics.voice, qos, retain, status)
            .await;
    }

    async fn publish_presence(&self) {
        match self.platform.guild_snapshot().await {
            Ok(guild) => self.publish_presence_for(&guild).await,
            Err(e) => warn!("Could not read presences: {}", e),
        }
    }

    async fn publish_presence_for(&self, guild: &GuildSnapshot) {
        let topics = &self.config.topics;
        let presence = project_presence(guild);
        self.publish_json(&topics.online, QoS::AtMostOnce, false, &presence)
            .await;
        self.publish_json(&topics.online_count, QoS::AtMostOnce, false, &presence.count())
            .await;
    }

    async fn publish_membership(&self) {
        match self.platform.guild_snapshot().await {
            Ok(guild) => self.publish_membership_for(&guild).await,
            Err(e) => warn!("Could not read voice channel membership: {}", e),
        }
    }

    async fn publish_membership_for(&self, guild: &GuildSnapshot) {
        let topics = &self.config.topics;
        let membership = project_membership(guild);
        self.publish_json(&topics.channels, QoS::AtMostOnce, false, &membership)
            .await;
        self.publish_json(&topics.channels_count, QoS::AtMostOnce, false, &membership.count())
            .await;
    }

    async fn publish_json<T: Serialize>(&self, topic: &str, qos: QoS, retain: bool, value: &T) {
        let payload = match serde_json::to_vec(value).map_err(BusError::from) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(topic, "Failed to publish: {}", e);
                return;
            }
        };
        self.publish_logged(topic, qos, retain, payload).await;
    }

    /// Publish raw bytes, logging failures. Returns whether the publish was accepted.
    async fn publish_logged(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> bool {
        match self.bus.publish(topic, qos, retain, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(topic, "Failed to publish: {}", e);
                false
            }
        }
    }
}
