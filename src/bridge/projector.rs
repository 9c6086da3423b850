//! State projection.
//!
//! Converts platform voice/presence state into the canonical snapshots
//! published on the bus. Everything here is a pure function of its inputs;
//! publishing is the controller's job.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::common::types::{ActivitySnapshot, GuildSnapshot, Snowflake, VoiceStateSnapshot};

/// Placeholder published for fields that have no value while disconnected.
pub const UNAVAILABLE: &str = "unavailable";

/// Binary-sensor style connection flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connection {
    On,
    Off,
}

/// A field that is either a value or the literal `"unavailable"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading<T> {
    Value(T),
    Unavailable,
}

impl<T: Serialize> Serialize for Reading<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Value(value) => value.serialize(serializer),
            Reading::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

/// Voice status of the watched member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceStatus {
    pub voice_connection: Connection,
    pub mute: Reading<bool>,
    pub deaf: Reading<bool>,
    pub channel: Reading<String>,
}

impl VoiceStatus {
    /// Derive the published status from a voice state.
    pub fn from_voice_state(state: &VoiceStateSnapshot) -> Self {
        match state.channel_id {
            None => Self {
                voice_connection: Connection::Off,
                mute: Reading::Unavailable,
                deaf: Reading::Unavailable,
                channel: Reading::Unavailable,
            },
            Some(channel_id) => Self {
                voice_connection: Connection::On,
                mute: Reading::Value(state.mute),
                deaf: Reading::Value(state.deaf),
                // Connected always reports a channel, falling back to its id
                channel: Reading::Value(
                    state
                        .channel_name
                        .clone()
                        .unwrap_or_else(|| channel_id.to_string()),
                ),
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        self.voice_connection == Connection::On
    }
}

/// Members of every voice channel, keyed by channel id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMembership {
    pub channels: BTreeMap<String, Vec<String>>,
}

impl ChannelMembership {
    /// Total number of members connected to any voice channel.
    pub fn count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }
}

/// One online guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPresence {
    pub username: String,
    pub activities: Vec<ActivitySnapshot>,
    #[serde(rename = "voiceChannel")]
    pub voice_channel: Option<String>,
}

/// Every non-bot guild member that is not offline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnlinePresenceList {
    pub online: Vec<UserPresence>,
}

impl OnlinePresenceList {
    pub fn count(&self) -> usize {
        self.online.len()
    }
}

/// Project a voice state change.
///
/// Returns `None` when the change belongs to anyone but the watched member.
pub fn project_voice_state(
    watched_user_id: Snowflake,
    old: Option<&VoiceStateSnapshot>,
    new: &VoiceStateSnapshot,
) -> Option<VoiceStatus> {
    let user_id = old.map(|state| state.user_id).unwrap_or(new.user_id);
    if user_id != watched_user_id {
        return None;
    }
    Some(VoiceStatus::from_voice_state(new))
}

/// Project the per-channel membership of every voice channel.
pub fn project_membership(guild: &GuildSnapshot) -> ChannelMembership {
    let mut channels: BTreeMap<String, Vec<String>> = guild
        .voice_channels
        .iter()
        .map(|channel| (channel.id.to_string(), Vec::new()))
        .collect();

    for member in &guild.members {
        let Some(channel_id) = member.voice_channel_id else {
            continue;
        };
        match channels.get_mut(&channel_id.to_string()) {
            Some(names) => names.push(member.username.clone()),
            None => debug!(
                user_id = member.user_id,
                channel_id, "Member is in a channel that is not a voice channel, skipping"
            ),
        }
    }

    ChannelMembership { channels }
}

/// Project the list of online members.
pub fn project_presence(guild: &GuildSnapshot) -> OnlinePresenceList {
    let members = guild.members_by_id();
    let mut online = Vec::new();

    for presence in guild.presences.iter().filter(|p| !p.status.is_offline()) {
        let Some(member) = members.get(&presence.user_id) else {
            warn!(user_id = presence.user_id, "Presence member is missing, skipping");
            continue;
        };
        if member.bot {
            continue;
        }

        let voice_channel = member
            .voice_channel_id
            .and_then(|id| guild.voice_channel(id))
            .map(|channel| channel.name.clone());

        online.push(UserPresence {
            username: member.username.clone(),
            activities: presence.activities.clone(),
            voice_channel,
        });
    }

    OnlinePresenceList { online }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{MemberSnapshot, PresenceSnapshot, PresenceStatus, VoiceChannel};
    use proptest::prelude::*;
    use serde_json::json;

    fn voice(user_id: Snowflake, channel: Option<(Snowflake, &str)>) -> VoiceStateSnapshot {
        VoiceStateSnapshot {
            user_id,
            channel_id: channel.map(|(id, _)| id),
            channel_name: channel.map(|(_, name)| name.to_string()),
            mute: true,
            deaf: false,
        }
    }

    fn member(user_id: Snowflake, name: &str, bot: bool, channel: Option<Snowflake>) -> MemberSnapshot {
        MemberSnapshot {
            user_id,
            username: name.to_string(),
            bot,
            voice_channel_id: channel,
        }
    }

    fn presence(user_id: Snowflake, status: PresenceStatus) -> PresenceSnapshot {
        PresenceSnapshot {
            user_id,
            status,
            activities: Vec::new(),
        }
    }

    fn sample_guild() -> GuildSnapshot {
        GuildSnapshot {
            voice_channels: vec![
                VoiceChannel { id: 10, name: "General".to_string(), position: 0 },
                VoiceChannel { id: 11, name: "AFK".to_string(), position: 1 },
            ],
            members: vec![
                member(1, "alice", false, Some(10)),
                member(2, "bob", false, None),
                member(3, "botty", true, Some(10)),
                member(4, "carol", false, Some(99)),
            ],
            presences: vec![
                presence(1, PresenceStatus::Online),
                presence(2, PresenceStatus::Offline),
                presence(3, PresenceStatus::Online),
                presence(5, PresenceStatus::Idle),
            ],
        }
    }

    #[test]
    fn test_voice_state_ignores_other_members() {
        let new = voice(2, Some((10, "General")));
        assert!(project_voice_state(1, None, &new).is_none());
    }

    #[test]
    fn test_voice_state_connected() {
        let new = voice(1, Some((10, "General")));
        let status = project_voice_state(1, None, &new).unwrap();

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "voice_connection": "ON",
                "mute": true,
                "deaf": false,
                "channel": "General",
            })
        );
    }

    #[test]
    fn test_voice_state_disconnected_is_unavailable() {
        let old = voice(1, Some((10, "General")));
        let new = voice(1, None);
        let status = project_voice_state(1, Some(&old), &new).unwrap();

        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "voice_connection": "OFF",
                "mute": "unavailable",
                "deaf": "unavailable",
                "channel": "unavailable",
            })
        );
    }

    #[test]
    fn test_voice_state_without_channel_name_uses_id() {
        let mut new = voice(1, Some((10, "General")));
        new.channel_name = None;
        let status = project_voice_state(1, None, &new).unwrap();
        assert_eq!(status.channel, Reading::Value("10".to_string()));
    }

    #[test]
    fn test_membership_seeds_every_channel() {
        let membership = project_membership(&sample_guild());

        assert_eq!(
            serde_json::to_value(&membership).unwrap(),
            json!({ "channels": { "10": ["alice", "botty"], "11": [] } })
        );
        assert_eq!(membership.count(), 2);
    }

    #[test]
    fn test_presence_excludes_bots_offline_and_unknown() {
        let list = project_presence(&sample_guild());

        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({ "online": [
                { "username": "alice", "activities": [], "voiceChannel": "General" }
            ]})
        );
        assert_eq!(list.count(), 1);
    }

    #[test]
    fn test_presence_serializes_activities() {
        let mut guild = sample_guild();
        guild.presences[0].activities.push(ActivitySnapshot {
            name: "Factorio".to_string(),
            kind: "Playing".to_string(),
            state: None,
            details: Some("Building".to_string()),
        });

        let value = serde_json::to_value(project_presence(&guild)).unwrap();
        assert_eq!(
            value["online"][0]["activities"],
            json!([{ "name": "Factorio", "type": "Playing", "details": "Building" }])
        );
    }

    fn arb_status() -> impl Strategy<Value = PresenceStatus> {
        prop_oneof![
            Just(PresenceStatus::Online),
            Just(PresenceStatus::Idle),
            Just(PresenceStatus::DoNotDisturb),
            Just(PresenceStatus::Invisible),
            Just(PresenceStatus::Offline),
        ]
    }

    proptest! {
        #[test]
        fn prop_membership_keys_and_count(
            channel_count in 0usize..8,
            assignments in proptest::collection::vec(proptest::option::of(0usize..8), 0..40),
        ) {
            let voice_channels: Vec<VoiceChannel> = (0..channel_count)
                .map(|i| VoiceChannel { id: 100 + i as u64, name: format!("vc{}", i), position: i as i32 })
                .collect();
            let members: Vec<MemberSnapshot> = assignments
                .iter()
                .enumerate()
                .map(|(i, slot)| {
                    let channel = slot
                        .filter(|_| channel_count > 0)
                        .map(|s| 100 + (s % channel_count) as u64);
                    member(i as u64 + 1, &format!("user{}", i), false, channel)
                })
                .collect();
            let connected = members.iter().filter(|m| m.voice_channel_id.is_some()).count();
            let guild = GuildSnapshot { voice_channels, members, presences: Vec::new() };

            let membership = project_membership(&guild);
            prop_assert_eq!(membership.channels.len(), channel_count);
            for channel in &guild.voice_channels {
                prop_assert!(membership.channels.contains_key(&channel.id.to_string()));
            }
            prop_assert_eq!(membership.count(), connected);
        }

        #[test]
        fn prop_presence_never_lists_bots(
            entries in proptest::collection::vec((any::<bool>(), arb_status()), 0..40),
        ) {
            let members: Vec<MemberSnapshot> = entries
                .iter()
                .enumerate()
                .map(|(i, (bot, _))| member(i as u64 + 1, &format!("user{}", i), *bot, None))
                .collect();
            let presences: Vec<PresenceSnapshot> = entries
                .iter()
                .enumerate()
                .map(|(i, (_, status))| presence(i as u64 + 1, *status))
                .collect();
            let eligible = entries
                .iter()
                .filter(|(bot, status)| !bot && !status.is_offline())
                .count();
            let guild = GuildSnapshot { voice_channels: Vec::new(), members, presences };

            let list = project_presence(&guild);
            prop_assert!(list.count() <= eligible);
            for entry in &list.online {
                let listed = guild.members.iter().find(|m| m.username == entry.username).unwrap();
                prop_assert!(!listed.bot);
            }
        }

        #[test]
        fn prop_disconnected_voice_is_unavailable(
            old_channel in proptest::option::of(1u64..1000),
            mute in any::<bool>(),
            deaf in any::<bool>(),
        ) {
            let old = VoiceStateSnapshot {
                user_id: 1,
                channel_id: old_channel,
                channel_name: old_channel.map(|id| format!("vc{}", id)),
                mute,
                deaf,
            };
            let new = VoiceStateSnapshot { user_id: 1, channel_id: None, channel_name: None, mute, deaf };

            let status = project_voice_state(1, Some(&old), &new).unwrap();
            prop_assert_eq!(status.voice_connection, Connection::Off);
            prop_assert_eq!(status.mute, Reading::Unavailable);
            prop_assert_eq!(status.deaf, Reading::Unavailable);
            prop_assert_eq!(status.channel, Reading::Unavailable);
        }
    }
}
