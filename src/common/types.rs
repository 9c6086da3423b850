//! Shared types used across the application.
//!
//! These are plain-data views of the chat platform's state. The Discord
//! adapter fills them from serenity's cache; everything downstream (state
//! projection, command preconditions, discovery) reads only these.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

/// Discord snowflake id.
pub type Snowflake = u64;

/// A member's current voice state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceStateSnapshot {
    pub user_id: Snowflake,
    /// Connected voice channel, `None` when not in voice.
    pub channel_id: Option<Snowflake>,
    /// Display name of the connected channel, if it could be resolved.
    pub channel_name: Option<String>,
    /// Server or self mute.
    pub mute: bool,
    /// Server or self deafen.
    pub deaf: bool,
}

impl VoiceStateSnapshot {
    /// Voice state of a member that is not connected to any channel.
    pub fn disconnected(user_id: Snowflake) -> Self {
        Self {
            user_id,
            channel_id: None,
            channel_name: None,
            mute: false,
            deaf: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel_id.is_some()
    }
}

/// A voice channel in the guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceChannel {
    pub id: Snowflake,
    pub name: String,
    pub position: i32,
}

/// A guild member as seen by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: Snowflake,
    pub username: String,
    pub bot: bool,
    pub voice_channel_id: Option<Snowflake>,
}

/// Presence status of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Idle,
    DoNotDisturb,
    Invisible,
    Offline,
}

impl PresenceStatus {
    pub fn is_offline(self) -> bool {
        matches!(self, Self::Offline)
    }
}

/// One activity entry of a presence (game, stream, custom status...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// A cached presence entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub user_id: Snowflake,
    pub status: PresenceStatus,
    pub activities: Vec<ActivitySnapshot>,
}

/// Read-only view of the watched guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub voice_channels: Vec<VoiceChannel>,
    pub members: Vec<MemberSnapshot>,
    pub presences: Vec<PresenceSnapshot>,
}

impl GuildSnapshot {
    /// Sort channels by position and members/presences by username so that
    /// equal guild state always produces identical output.
    pub fn normalized(mut self) -> Self {
        self.voice_channels
            .sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        self.members.sort_by(compare_members);

        let order: HashMap<Snowflake, usize> = self
            .members
            .iter()
            .enumerate()
            .map(|(index, m)| (m.user_id, index))
            .collect();
        self.presences
            .sort_by_key(|p| order.get(&p.user_id).copied().unwrap_or(usize::MAX));
        self
    }

    /// Members keyed by user id.
    pub fn members_by_id(&self) -> HashMap<Snowflake, &MemberSnapshot> {
        self.members.iter().map(|m| (m.user_id, m)).collect()
    }

    pub fn voice_channel(&self, channel_id: Snowflake) -> Option<&VoiceChannel> {
        self.voice_channels.iter().find(|c| c.id == channel_id)
    }

    /// Find a voice channel by display name, ignoring case.
    pub fn voice_channel_by_name(&self, name: &str) -> Option<&VoiceChannel> {
        let name = name.trim().to_lowercase();
        self.voice_channels
            .iter()
            .find(|c| c.name.to_lowercase() == name)
    }

    pub fn voice_channel_names(&self) -> Vec<String> {
        self.voice_channels.iter().map(|c| c.name.clone()).collect()
    }
}

fn compare_members(a: &MemberSnapshot, b: &MemberSnapshot) -> Ordering {
    a.username
        .to_lowercase()
        .cmp(&b.username.to_lowercase())
        .then_with(|| a.user_id.cmp(&b.user_id))
}
