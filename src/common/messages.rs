//! Canonical event types flowing into the bridge controller.
//!
//! The Discord adapter and the MQTT event-loop pump translate their library
//! events into these, so the controller never touches serenity or rumqttc
//! event types directly.

use crate::common::types::{Snowflake, VoiceStateSnapshot};

/// Events emitted by the chat platform.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// Logged in and guild data cached.
    Ready { bot_id: Snowflake, bot_name: String },
    /// A member's voice state changed (join, leave, move, mute, deafen).
    VoiceStateUpdate {
        old: Option<VoiceStateSnapshot>,
        new: VoiceStateSnapshot,
    },
    /// A member's presence changed.
    PresenceUpdate { user_id: Snowflake },
    /// Gateway connection lost.
    Disconnected,
}

/// Events emitted by the message bus client.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// Connection (or reconnection) acknowledged by the broker.
    Connected,
    /// Message received on a subscribed topic.
    Message { topic: String, payload: String },
    /// Connection error; the client retries on its own.
    Disconnected(String),
}
