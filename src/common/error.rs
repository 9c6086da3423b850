//! Error types for the application.

use thiserror::Error;

use crate::common::types::Snowflake;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised by the chat platform (Discord) surface.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Discord session is not ready yet")]
    NotReady,

    #[error("Guild {guild_id} is not available in the cache")]
    GuildUnavailable { guild_id: Snowflake },

    #[error("Member {user_id} not found in guild")]
    MemberNotFound { user_id: Snowflake },

    #[error("Discord rejected the request: {0}")]
    Serenity(#[from] serenity::Error),
}

/// Errors raised by the message bus (MQTT) surface.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons an inbound command is dropped.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Empty command, ignoring")]
    Empty,

    #[error("The command '{verb}' is not supported")]
    Unsupported { verb: String },

    #[error("User is not connected to a voice channel")]
    NotInVoiceChannel,

    #[error("Voice channel '{name}' not found")]
    ChannelNotFound { name: String },

    #[error("Failed to {action}: {source}")]
    Platform {
        action: &'static str,
        #[source]
        source: PlatformError,
    },
}

/// Result type alias for Discord operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Result type alias for MQTT operations.
pub type BusResult<T> = std::result::Result<T, BusError>;
