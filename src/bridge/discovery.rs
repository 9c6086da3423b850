//! Home Assistant MQTT discovery catalog.
//!
//! Builds the self-describing config messages that let Home Assistant create
//! the bridge's entities. The output depends only on the configuration and
//! the current voice channel names.

use serde::Serialize;

use crate::config::types::BridgeConfig;

const AVAILABLE: &str = "ON";
const NOT_AVAILABLE: &str = "OFF";
const VOICE_AVAILABILITY_TEMPLATE: &str = "{{ value_json.voice_connection }}";

/// Device every entity is grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub name: String,
    pub model: String,
    pub manufacturer: String,
    pub sw_version: String,
}

/// Entity configuration payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryPayload {
    pub name: String,
    pub unique_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_not_available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub device: Option<Device>,
}

impl DiscoveryPayload {
    /// Bind availability to the watched member being in a voice channel.
    fn available_in_voice(mut self, voice_topic: &str) -> Self {
        self.availability_topic = Some(voice_topic.to_string());
        self.availability_template = Some(VOICE_AVAILABILITY_TEMPLATE.to_string());
        self.payload_available = Some(AVAILABLE.to_string());
        self.payload_not_available = Some(NOT_AVAILABLE.to_string());
        self
    }
}

/// One discovery message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryComponent {
    pub topic: String,
    pub payload: DiscoveryPayload,
}

impl DiscoveryComponent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Build the full discovery catalog.
pub fn build_discovery_components(
    config: &BridgeConfig,
    voice_channel_names: &[String],
) -> Vec<DiscoveryComponent> {
    let topics = &config.topics;
    let device_id = format!("discordUser_{}", config.watched_user_id());
    let device = Device {
        identifiers: vec![device_id.clone()],
        name: "Discord".to_string(),
        model: "Discord voice bot integration".to_string(),
        manufacturer: env!("CARGO_PKG_NAME").to_string(),
        sw_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let component = |kind: &str, object: &str, payload: DiscoveryPayload| DiscoveryComponent {
        topic: format!("{}/{}/{}/{}/config", topics.discovery, kind, device_id, object),
        payload: DiscoveryPayload {
            unique_id: format!("{}_{}", device_id, object),
            device: Some(device.clone()),
            ..payload
        },
    };

    vec![
        // Voice connection sensor, always available
        component(
            "binary_sensor",
            "voice",
            DiscoveryPayload {
                name: "Discord Voice Connection".to_string(),
                device_class: some("connectivity"),
                state_topic: Some(topics.voice.clone()),
                json_attributes_topic: Some(topics.voice.clone()),
                value_template: Some(VOICE_AVAILABILITY_TEMPLATE.to_string()),
                ..Default::default()
            },
        ),
        // Online member count, always available
        component(
            "sensor",
            "users_online",
            DiscoveryPayload {
                name: "Discord Guild Users Online".to_string(),
                state_topic: Some(topics.online_count.clone()),
                json_attributes_topic: Some(topics.online.clone()),
                icon: some("mdi:account-group"),
                ..Default::default()
            },
        ),
        component(
            "switch",
            "mute",
            DiscoveryPayload {
                name: "Discord Mute".to_string(),
                device_class: some("switch"),
                command_topic: Some(topics.command.clone()),
                state_topic: Some(topics.voice.clone()),
                value_template: some("{{ value_json.mute | string | lower }}"),
                state_on: some("true"),
                state_off: some("false"),
                payload_on: some("mute"),
                payload_off: some("unmute"),
                icon: some("mdi:microphone-off"),
                ..Default::default()
            }
            .available_in_voice(&topics.voice),
        ),
        component(
            "switch",
            "deaf",
            DiscoveryPayload {
                name: "Discord Deafen".to_string(),
                device_class: some("switch"),
                command_topic: Some(topics.command.clone()),
                state_topic: Some(topics.voice.clone()),
                value_template: some("{{ value_json.deaf | string | lower }}"),
                state_on: some("true"),
                state_off: some("false"),
                payload_on: some("deaf"),
                payload_off: some("undeaf"),
                icon: some("mdi:headphones-off"),
                ..Default::default()
            }
            .available_in_voice(&topics.voice),
        ),
        component(
            "select",
            "channel",
            DiscoveryPayload {
                name: "Discord Channel Selector".to_string(),
                options: Some(voice_channel_names.to_vec()),
                command_topic: Some(topics.command.clone()),
                command_template: some("move {{ value }}"),
                state_topic: Some(topics.voice.clone()),
                value_template: some("{{ value_json.channel }}"),
                icon: some("mdi:account-voice"),
                ..Default::default()
            }
            .available_in_voice(&topics.voice),
        ),
        component(
            "button",
            "disconnect",
            DiscoveryPayload {
                name: "Discord Disconnect".to_string(),
                command_topic: Some(topics.command.clone()),
                command_template: some("disconnect"),
                icon: some("mdi:account-off"),
                ..Default::default()
            }
            .available_in_voice(&topics.voice),
        ),
        component(
            "text",
            "activity",
            DiscoveryPayload {
                name: "Bot Activity".to_string(),
                state_topic: Some(topics.activity.clone()),
                command_topic: Some(topics.command.clone()),
                command_template: some("bot_activity {{ value }}"),
                icon: some("mdi:robot"),
                ..Default::default()
            },
        ),
    ]
}
