//! Capability surfaces the bridge is built against.
//!
//! The controller, projector and command interpreter only see these traits;
//! `discord::SerenityPlatform` and `mqtt::MqttBus` implement them for the
//! real clients and tests substitute recording fakes.

use rumqttc::QoS;
use serenity::async_trait;

use crate::common::error::{BusResult, PlatformResult};
use crate::common::types::{GuildSnapshot, Snowflake, VoiceStateSnapshot};

/// Operations the bridge performs against the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync + 'static {
    /// Current channels, members and presences of the watched guild.
    async fn guild_snapshot(&self) -> PlatformResult<GuildSnapshot>;

    /// Live voice state of a guild member.
    async fn member_voice(&self, user_id: Snowflake) -> PlatformResult<VoiceStateSnapshot>;

    async fn set_mute(&self, user_id: Snowflake, mute: bool) -> PlatformResult<()>;

    async fn set_deaf(&self, user_id: Snowflake, deaf: bool) -> PlatformResult<()>;

    async fn move_member(&self, user_id: Snowflake, channel_id: Snowflake) -> PlatformResult<()>;

    async fn disconnect_member(&self, user_id: Snowflake) -> PlatformResult<()>;

    /// Whether the bot may change its own nickname in the guild.
    async fn can_change_nickname(&self) -> PlatformResult<bool>;

    /// Set the bot's guild nickname; `None` resets it.
    async fn set_nickname(&self, nickname: Option<&str>) -> PlatformResult<()>;

    /// Set the bot's custom status text.
    async fn set_activity(&self, text: &str) -> PlatformResult<()>;
}

/// Publish/subscribe operations on the message bus.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> BusResult<()>;

    async fn subscribe(&self, topic: &str, qos: QoS) -> BusResult<()>;
}
