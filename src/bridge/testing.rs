//! Recording fakes for the platform and bus seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rumqttc::QoS;
use serenity::async_trait;

use crate::bridge::ports::{ChatPlatform, MessageBus};
use crate::common::error::{BusResult, PlatformError, PlatformResult};
use crate::common::types::{
    GuildSnapshot, MemberSnapshot, PresenceSnapshot, PresenceStatus, Snowflake, VoiceChannel,
    VoiceStateSnapshot,
};

pub const GENERAL: Snowflake = 10;
pub const GAMING: Snowflake = 11;
pub const FRIEND: Snowflake = 2;
pub const BOT: Snowflake = 3;

/// A mutation issued against the fake platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SetMute(Snowflake, bool),
    SetDeaf(Snowflake, bool),
    Move(Snowflake, Snowflake),
    Disconnect(Snowflake),
    SetNickname(Option<String>),
    SetActivity(String),
}

pub struct FakePlatform {
    guild: Mutex<Option<GuildSnapshot>>,
    voice: Mutex<HashMap<Snowflake, VoiceStateSnapshot>>,
    calls: Mutex<Vec<PlatformCall>>,
    fail_mutations: AtomicBool,
    nickname_allowed: AtomicBool,
}

impl FakePlatform {
    /// Guild with two voice channels; the watched member sits in "General".
    pub fn with_watched_in_voice(watched: Snowflake) -> Self {
        let platform = Self::with_guild(sample_guild(watched, Some(GENERAL)));
        platform.set_voice(VoiceStateSnapshot {
            user_id: watched,
            channel_id: Some(GENERAL),
            channel_name: Some("General".to_string()),
            mute: false,
            deaf: false,
        });
        platform
    }

    /// Same guild, watched member not in any voice channel.
    pub fn with_watched_disconnected(watched: Snowflake) -> Self {
        Self::with_guild(sample_guild(watched, None))
    }

    fn with_guild(guild: GuildSnapshot) -> Self {
        Self {
            guild: Mutex::new(Some(guild)),
            voice: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_mutations: AtomicBool::new(false),
            nickname_allowed: AtomicBool::new(true),
        }
    }

    pub fn set_guild(&self, guild: Option<GuildSnapshot>) {
        *self.guild.lock().unwrap() = guild;
    }

    pub fn set_voice(&self, state: VoiceStateSnapshot) {
        self.voice.lock().unwrap().insert(state.user_id, state);
    }

    pub fn fail_mutations(&self) {
        self.fail_mutations.store(true, Ordering::SeqCst);
    }

    pub fn deny_nickname(&self) {
        self.nickname_allowed.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall) -> PlatformResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(PlatformError::NotReady)
        } else {
            Ok(())
        }
    }
}

fn sample_guild(watched: Snowflake, watched_channel: Option<Snowflake>) -> GuildSnapshot {
    let member = |user_id, username: &str, bot, voice_channel_id| MemberSnapshot {
        user_id,
        username: username.to_string(),
        bot,
        voice_channel_id,
    };
    let online = |user_id| PresenceSnapshot {
        user_id,
        status: PresenceStatus::Online,
        activities: Vec::new(),
    };

    GuildSnapshot {
        voice_channels: vec![
            VoiceChannel { id: GENERAL, name: "General".to_string(), position: 0 },
            VoiceChannel { id: GAMING, name: "Gaming Room".to_string(), position: 1 },
        ],
        members: vec![
            member(watched, "watcher", false, watched_channel),
            member(FRIEND, "friend", false, Some(GAMING)),
            member(BOT, "housebot", true, None),
        ],
        presences: vec![online(watched), online(FRIEND), online(BOT)],
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn guild_snapshot(&self) -> PlatformResult<GuildSnapshot> {
        self.guild.lock().unwrap().clone().ok_or(PlatformError::NotReady)
    }

    async fn member_voice(&self, user_id: Snowflake) -> PlatformResult<VoiceStateSnapshot> {
        let guild = self.guild_snapshot().await?;
        if let Some(state) = self.voice.lock().unwrap().get(&user_id) {
            return Ok(state.clone());
        }
        guild
            .members
            .iter()
            .any(|m| m.user_id == user_id)
            .then(|| VoiceStateSnapshot::disconnected(user_id))
            .ok_or(PlatformError::MemberNotFound { user_id })
    }

    async fn set_mute(&self, user_id: Snowflake, mute: bool) -> PlatformResult<()> {
        self.record(PlatformCall::SetMute(user_id, mute))
    }

    async fn set_deaf(&self, user_id: Snowflake, deaf: bool) -> PlatformResult<()> {
        self.record(PlatformCall::SetDeaf(user_id, deaf))
    }

    async fn move_member(&self, user_id: Snowflake, channel_id: Snowflake) -> PlatformResult<()> {
        self.record(PlatformCall::Move(user_id, channel_id))
    }

    async fn disconnect_member(&self, user_id: Snowflake) -> PlatformResult<()> {
        self.record(PlatformCall::Disconnect(user_id))
    }

    async fn can_change_nickname(&self) -> PlatformResult<bool> {
        Ok(self.nickname_allowed.load(Ordering::SeqCst))
    }

    async fn set_nickname(&self, nickname: Option<&str>) -> PlatformResult<()> {
        self.record(PlatformCall::SetNickname(nickname.map(str::to_string)))
    }

    async fn set_activity(&self, text: &str) -> PlatformResult<()> {
        self.record(PlatformCall::SetActivity(text.to_string()))
    }
}

/// A message published on the fake bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: String,
}

#[derive(Default)]
pub struct FakeBus {
    published: Mutex<Vec<Published>>,
    subscriptions: Mutex<Vec<String>>,
}

impl FakeBus {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn published_to(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn publish(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> BusResult<()> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload: String::from_utf8_lossy(&payload).into_owned(),
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str, _qos: QoS) -> BusResult<()> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}
