//! Inbound bus commands (mute, move, bot_nick, etc).
//!
//! Parses the single-line text commands Home Assistant sends on the command
//! topic and applies them to the watched member. Every command is checked
//! against voice state fetched at execution time, never a cached copy.

use std::sync::Arc;

use rumqttc::QoS;
use tracing::{debug, error, info, warn};

use crate::bridge::ports::{ChatPlatform, MessageBus};
use crate::common::error::{CommandError, PlatformError};
use crate::common::types::Snowflake;

/// A raw command split into verb and argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Lowercased first token.
    pub verb: String,
    /// Everything after the verb, inner whitespace kept as sent.
    pub argument: String,
}

impl CommandRequest {
    pub fn parse(message: &str) -> Result<Self, CommandError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(CommandError::Empty);
        }

        let (verb, argument) = message
            .split_once(char::is_whitespace)
            .unwrap_or((message, ""));
        Ok(Self {
            verb: verb.to_lowercase(),
            argument: argument.trim().to_string(),
        })
    }
}

/// Commands accepted on the command topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mute,
    Unmute,
    Deaf,
    Undeaf,
    Disconnect,
    Move { channel: String },
    BotActivity { text: String },
    BotNick { nickname: String },
}

impl Command {
    /// Parse a raw command message.
    pub fn parse(message: &str) -> Result<Self, CommandError> {
        Self::try_from(CommandRequest::parse(message)?)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::Deaf => "deaf",
            Self::Undeaf => "undeaf",
            Self::Disconnect => "disconnect",
            Self::Move { .. } => "move",
            Self::BotActivity { .. } => "bot_activity",
            Self::BotNick { .. } => "bot_nick",
        }
    }

    /// Whether the watched member must be in a voice channel.
    pub fn requires_voice_channel(&self) -> bool {
        !matches!(self, Self::BotActivity { .. } | Self::BotNick { .. })
    }
}

impl TryFrom<CommandRequest> for Command {
    type Error = CommandError;

    fn try_from(request: CommandRequest) -> Result<Self, Self::Error> {
        let command = match request.verb.as_str() {
            "mute" => Self::Mute,
            "unmute" => Self::Unmute,
            "deaf" => Self::Deaf,
            "undeaf" => Self::Undeaf,
            "disconnect" => Self::Disconnect,
            "move" => Self::Move {
                channel: request.argument,
            },
            "bot_activity" => Self::BotActivity {
                text: request.argument,
            },
            "bot_nick" => Self::BotNick {
                nickname: request.argument,
            },
            _ => return Err(CommandError::Unsupported { verb: request.verb }),
        };
        Ok(command)
    }
}

/// What happened to an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Not applied, but not an error either.
    Skipped { reason: &'static str },
}

pub type CommandResult = Result<CommandOutcome, CommandError>;

fn platform_failure(action: &'static str) -> impl FnOnce(PlatformError) -> CommandError {
    move |source| CommandError::Platform { action, source }
}

/// Applies commands to the watched member and the bot account.
pub struct CommandInterpreter<P, B> {
    platform: Arc<P>,
    bus: Arc<B>,
    watched_user_id: Snowflake,
    activity_topic: String,
}

impl<P: ChatPlatform, B: MessageBus> CommandInterpreter<P, B> {
    pub fn new(
        platform: Arc<P>,
        bus: Arc<B>,
        watched_user_id: Snowflake,
        activity_topic: String,
    ) -> Self {
        Self {
            platform,
            bus,
            watched_user_id,
            activity_topic,
        }
    }

    /// Interpret a raw message and log the outcome. Never fails.
    pub async fn handle(&self, message: &str) {
        let result = self.interpret(message).await;
        log_result(message, &result);
    }

    /// Parse and execute a raw message.
    pub async fn interpret(&self, message: &str) -> CommandResult {
        let command = Command::parse(message)?;
        debug!(verb = command.verb(), "Executing command");
        self.execute(command).await
    }

    pub async fn execute(&self, command: Command) -> CommandResult {
        let user_id = self.watched_user_id;
        let platform = &self.platform;

        if command.requires_voice_channel() {
            let voice = platform
                .member_voice(user_id)
                .await
                .map_err(platform_failure("read voice state"))?;
            if !voice.is_connected() {
                return Err(CommandError::NotInVoiceChannel);
            }
        }

        match command {
            Command::Mute => platform
                .set_mute(user_id, true)
                .await
                .map_err(platform_failure("mute"))?,
            Command::Unmute => platform
                .set_mute(user_id, false)
                .await
                .map_err(platform_failure("unmute"))?,
            Command::Deaf => {
                platform
                    .set_deaf(user_id, true)
                    .await
                    .map_err(platform_failure("deafen"))?;
                platform
                    .set_mute(user_id, true)
                    .await
                    .map_err(platform_failure("deafen"))?;
            }
            Command::Undeaf => {
                platform
                    .set_deaf(user_id, false)
                    .await
                    .map_err(platform_failure("undeafen"))?;
                platform
                    .set_mute(user_id, false)
                    .await
                    .map_err(platform_failure("undeafen"))?;
            }
            Command::Disconnect => platform
                .disconnect_member(user_id)
                .await
                .map_err(platform_failure("disconnect"))?,
            Command::Move { channel } => {
                let guild = platform
                    .guild_snapshot()
                    .await
                    .map_err(platform_failure("look up voice channels"))?;
                let target = guild
                    .voice_channel_by_name(&channel)
                    .ok_or_else(|| CommandError::ChannelNotFound {
                        name: channel.clone(),
                    })?;
                platform
                    .move_member(user_id, target.id)
                    .await
                    .map_err(platform_failure("move"))?;
            }
            Command::BotActivity { text } => return self.set_bot_activity(&text).await,
            Command::BotNick { nickname } => return self.set_bot_nickname(&nickname).await,
        }
        Ok(CommandOutcome::Applied)
    }

    /// Set the bot's guild nickname if the bot is allowed to.
    pub async fn set_bot_nickname(&self, nickname: &str) -> CommandResult {
        let allowed = self
            .platform
            .can_change_nickname()
            .await
            .map_err(platform_failure("check nickname permission"))?;
        if !allowed {
            return Ok(CommandOutcome::Skipped {
                reason: "bot lacks permission to change its nickname",
            });
        }

        let nickname = nickname.trim();
        let nickname = (!nickname.is_empty()).then_some(nickname);
        self.platform
            .set_nickname(nickname)
            .await
            .map_err(platform_failure("set bot nickname"))?;
        Ok(CommandOutcome::Applied)
    }

    async fn set_bot_activity(&self, text: &str) -> CommandResult {
        let text = text.trim();
        self.platform
            .set_activity(text)
            .await
            .map_err(platform_failure("set bot activity"))?;

        if let Err(e) = self
            .bus
            .publish(&self.activity_topic, QoS::AtMostOnce, false, text.as_bytes().to_vec())
            .await
        {
            warn!(topic = %self.activity_topic, "Failed to publish bot activity: {}", e);
        }
        Ok(CommandOutcome::Applied)
    }
}

/// Log a command result at the level matching its category.
pub fn log_result(message: &str, result: &CommandResult) {
    match result {
        Ok(CommandOutcome::Applied) => info!(command = %message.trim(), "Command applied"),
        Ok(CommandOutcome::Skipped { reason }) => {
            info!(command = %message.trim(), "Command skipped: {}", reason)
        }
        Err(e @ CommandError::Platform { .. }) => {
            error!(command = %message.trim(), "Command failed: {}", e)
        }
        Err(e) => warn!(command = %message.trim(), "Command rejected: {}", e),
    }
}
