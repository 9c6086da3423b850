//! `ChatPlatform` over serenity's cache and HTTP client.

use std::sync::Arc;

use serenity::all::{
    ActivityData, Cache, ChannelId, EditMember, Guild, GuildId, Http, OnlineStatus,
    ShardMessenger, UserId,
};
use serenity::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::bridge::ports::ChatPlatform;
use crate::common::error::{PlatformError, PlatformResult};
use crate::common::types::{GuildSnapshot, Snowflake, VoiceStateSnapshot};
use crate::discord::snapshot;

/// Live gateway handles, replaced on every `ready`.
#[derive(Clone)]
pub struct Session {
    pub http: Arc<Http>,
    pub cache: Arc<Cache>,
    pub shard: ShardMessenger,
}

pub struct SerenityPlatform {
    guild_id: GuildId,
    session: RwLock<Option<Session>>,
}

impl SerenityPlatform {
    pub fn new(guild_id: Snowflake) -> Self {
        Self {
            guild_id: GuildId::new(guild_id),
            session: RwLock::new(None),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub async fn install_session(&self, session: Session) {
        debug!("Installing Discord session handles");
        *self.session.write().await = Some(session);
    }

    async fn session(&self) -> PlatformResult<Session> {
        self.session.read().await.clone().ok_or(PlatformError::NotReady)
    }

    /// Run `f` against the cached guild. The cache guard never crosses an await.
    fn with_guild<T>(&self, session: &Session, f: impl FnOnce(&Guild) -> T) -> PlatformResult<T> {
        let guild = session
            .cache
            .guild(self.guild_id)
            .ok_or(PlatformError::GuildUnavailable {
                guild_id: self.guild_id.get(),
            })?;
        Ok(f(&*guild))
    }

    async fn edit_member(&self, user_id: Snowflake, builder: EditMember<'_>) -> PlatformResult<()> {
        let session = self.session().await?;
        self.guild_id
            .edit_member(&*session.http, UserId::new(user_id), builder)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn guild_snapshot(&self) -> PlatformResult<GuildSnapshot> {
        let session = self.session().await?;
        // Sort after the cache guard is released
        self.with_guild(&session, snapshot::guild_snapshot)
            .map(GuildSnapshot::normalized)
    }

    async fn member_voice(&self, user_id: Snowflake) -> PlatformResult<VoiceStateSnapshot> {
        let session = self.session().await?;
        self.with_guild(&session, |guild| {
            snapshot::member_voice_snapshot(guild, UserId::new(user_id))
        })?
        .ok_or(PlatformError::MemberNotFound { user_id })
    }

    async fn set_mute(&self, user_id: Snowflake, mute: bool) -> PlatformResult<()> {
        self.edit_member(user_id, EditMember::new().mute(mute)).await
    }

    async fn set_deaf(&self, user_id: Snowflake, deaf: bool) -> PlatformResult<()> {
        self.edit_member(user_id, EditMember::new().deafen(deaf)).await
    }

    async fn move_member(&self, user_id: Snowflake, channel_id: Snowflake) -> PlatformResult<()> {
        self.edit_member(
            user_id,
            EditMember::new().voice_channel(ChannelId::new(channel_id)),
        )
        .await
    }

    async fn disconnect_member(&self, user_id: Snowflake) -> PlatformResult<()> {
        self.edit_member(user_id, EditMember::new().disconnect_member())
            .await
    }

    async fn can_change_nickname(&self) -> PlatformResult<bool> {
        let session = self.session().await?;
        let bot_id = session.cache.current_user().id;
        self.with_guild(&session, |guild| {
            snapshot::can_change_own_nickname(guild, bot_id)
        })?
        .ok_or(PlatformError::MemberNotFound {
            user_id: bot_id.get(),
        })
    }

    async fn set_nickname(&self, nickname: Option<&str>) -> PlatformResult<()> {
        let session = self.session().await?;
        self.guild_id.edit_nickname(&*session.http, nickname).await?;
        Ok(())
    }

    async fn set_activity(&self, text: &str) -> PlatformResult<()> {
        let session = self.session().await?;
        session
            .shard
            .set_presence(Some(ActivityData::custom(text)), OnlineStatus::Online);
        Ok(())
    }
}
