//! Conversions from serenity's cached models to bridge snapshots.

use serenity::all::{
    Activity, ChannelType, Guild, OnlineStatus, Permissions, Presence, RoleId, UserId, VoiceState,
};

use crate::common::types::{
    ActivitySnapshot, GuildSnapshot, MemberSnapshot, PresenceSnapshot, PresenceStatus,
    VoiceChannel, VoiceStateSnapshot,
};

/// Copy the bridge's view out of a cached guild. Ordering is left to
/// `GuildSnapshot::normalized`.
pub fn guild_snapshot(guild: &Guild) -> GuildSnapshot {
    let voice_channels = guild
        .channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Voice)
        .map(|channel| VoiceChannel {
            id: channel.id.get(),
            name: channel.name.clone(),
            position: i32::from(channel.position),
        })
        .collect();

    let members = guild
        .members
        .values()
        .map(|member| MemberSnapshot {
            user_id: member.user.id.get(),
            username: member.user.name.clone(),
            bot: member.user.bot,
            voice_channel_id: guild
                .voice_states
                .get(&member.user.id)
                .and_then(|state| state.channel_id)
                .map(|id| id.get()),
        })
        .collect();

    let presences = guild.presences.values().map(presence_snapshot).collect();

    GuildSnapshot {
        voice_channels,
        members,
        presences,
    }
}

/// Convert a voice state, resolving the channel name from the guild if given.
///
/// Server and self flags are merged.
pub fn voice_state_snapshot(state: &VoiceState, guild: Option<&Guild>) -> VoiceStateSnapshot {
    let channel_name = state.channel_id.and_then(|channel_id| {
        guild
            .and_then(|guild| guild.channels.get(&channel_id))
            .map(|channel| channel.name.clone())
    });

    VoiceStateSnapshot {
        user_id: state.user_id.get(),
        channel_id: state.channel_id.map(|id| id.get()),
        channel_name,
        mute: state.mute || state.self_mute,
        deaf: state.deaf || state.self_deaf,
    }
}

/// Voice state of a member of `guild`, disconnected if they have none.
pub fn member_voice_snapshot(guild: &Guild, user_id: UserId) -> Option<VoiceStateSnapshot> {
    if let Some(state) = guild.voice_states.get(&user_id) {
        return Some(voice_state_snapshot(state, Some(guild)));
    }
    guild
        .members
        .contains_key(&user_id)
        .then(|| VoiceStateSnapshot::disconnected(user_id.get()))
}

fn presence_snapshot(presence: &Presence) -> PresenceSnapshot {
    PresenceSnapshot {
        user_id: presence.user.id.get(),
        status: presence_status(presence.status),
        activities: presence.activities.iter().map(activity_snapshot).collect(),
    }
}

fn activity_snapshot(activity: &Activity) -> ActivitySnapshot {
    ActivitySnapshot {
        name: activity.name.clone(),
        kind: format!("{:?}", activity.kind),
        state: activity.state.clone(),
        details: activity.details.clone(),
    }
}

pub fn presence_status(status: OnlineStatus) -> PresenceStatus {
    match status {
        OnlineStatus::Online => PresenceStatus::Online,
        OnlineStatus::Idle => PresenceStatus::Idle,
        OnlineStatus::DoNotDisturb => PresenceStatus::DoNotDisturb,
        OnlineStatus::Invisible => PresenceStatus::Invisible,
        _ => PresenceStatus::Offline,
    }
}

/// Whether `user_id` may change its own nickname in `guild`.
pub fn can_change_own_nickname(guild: &Guild, user_id: UserId) -> Option<bool> {
    let member = guild.members.get(&user_id)?;
    let everyone = RoleId::new(guild.id.get());

    let permissions = std::iter::once(&everyone)
        .chain(member.roles.iter())
        .filter_map(|role_id| guild.roles.get(role_id))
        .map(|role| role.permissions);

    Some(nickname_allowed(guild.owner_id == user_id, permissions))
}

/// Owners always may; everyone else needs `CHANGE_NICKNAME` or `ADMINISTRATOR`
/// from any of their roles.
pub fn nickname_allowed(is_owner: bool, roles: impl IntoIterator<Item = Permissions>) -> bool {
    if is_owner {
        return true;
    }
    let combined = roles
        .into_iter()
        .fold(Permissions::empty(), |acc, permissions| acc | permissions);
    combined.intersects(Permissions::ADMINISTRATOR | Permissions::CHANGE_NICKNAME)
}
