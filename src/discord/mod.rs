//! Discord bot integration.
//!
//! Connects to the gateway, forwards voice/presence events for the watched
//! guild and implements `ChatPlatform` on top of serenity.

pub mod client;
pub mod platform;
pub mod snapshot;

use serenity::all::Permissions;

use crate::common::types::Snowflake;

pub use client::DiscordBotBuilder;
pub use platform::SerenityPlatform;

/// Permissions the bridge needs in the guild.
pub fn required_permissions() -> Permissions {
    Permissions::CHANGE_NICKNAME
        | Permissions::MANAGE_NICKNAMES
        | Permissions::MUTE_MEMBERS
        | Permissions::DEAFEN_MEMBERS
        | Permissions::MOVE_MEMBERS
        | Permissions::VIEW_CHANNEL
        | Permissions::CONNECT
}

/// OAuth2 link that adds the bot to a guild with the permissions it needs.
pub fn invite_url(bot_id: Snowflake) -> String {
    format!(
        "https://discord.com/api/oauth2/authorize?client_id={}&permissions={}&scope=bot",
        bot_id,
        required_permissions().bits()
    )
}
