//! Configuration type definitions.

use serde::Deserialize;

use crate::common::types::Snowflake;

/// Topic Home Assistant announces its availability on.
pub const HUB_STATUS_TOPIC: &str = "homeassistant/status";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Snowflake,
    /// The member whose voice state is mirrored onto the bus.
    #[serde(default)]
    pub watched_user_id: Snowflake,
    /// Guild nickname the bot applies to itself on login.
    #[serde(default)]
    pub nickname: String,
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_mqtt_port(),
            username: String::new(),
            password: String::new(),
            client_id: String::new(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

impl MqttConfig {
    /// Client id as registered with the broker.
    pub fn broker_client_id(&self) -> String {
        format!("discord_bot_{}", self.client_id)
    }
}

/// Topic namespace settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicsConfig {
    /// Base topic all bridge topics are derived from.
    #[serde(default)]
    pub base: String,
    /// Home Assistant discovery prefix.
    #[serde(default = "default_discovery")]
    pub discovery: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            base: String::new(),
            discovery: default_discovery(),
        }
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

fn default_discovery() -> String {
    "homeassistant".to_string()
}

/// Every topic the bridge publishes to or listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    pub base: String,
    pub connected: String,
    pub online: String,
    pub online_count: String,
    pub command: String,
    pub voice: String,
    pub channels: String,
    pub channels_count: String,
    pub activity: String,
    pub discovery: String,
    pub hub_status: String,
}

impl TopicMap {
    pub fn new(base: &str, discovery: &str) -> Self {
        let base = base.trim_end_matches('/');
        let online = format!("{}/online", base);
        let channels = format!("{}/channels", base);
        Self {
            base: base.to_string(),
            connected: format!("{}/connected", base),
            online_count: format!("{}/count", online),
            online,
            command: format!("{}/command", base),
            voice: format!("{}/voice", base),
            channels_count: format!("{}/count", channels),
            channels,
            activity: format!("{}/activity", base),
            discovery: discovery.trim_end_matches('/').to_string(),
            hub_status: HUB_STATUS_TOPIC.to_string(),
        }
    }
}

/// Immutable settings the bridge runs with.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub discord: DiscordConfig,
    pub mqtt: MqttConfig,
    pub topics: TopicMap,
}

impl BridgeConfig {
    pub fn watched_user_id(&self) -> Snowflake {
        self.discord.watched_user_id
    }
}

impl From<Config> for BridgeConfig {
    fn from(config: Config) -> Self {
        let topics = TopicMap::new(&config.topics.base, &config.topics.discovery);
        Self {
            discord: config.discord,
            mqtt: config.mqtt,
            topics,
        }
    }
}
