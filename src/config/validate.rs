//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.
//! Every field must be populated before the bridge starts.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Validate Discord config
    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    if config.discord.guild_id == 0 {
        errors.push("discord.guild_id is required".to_string());
    }
    if config.discord.watched_user_id == 0 {
        errors.push("discord.watched_user_id is required".to_string());
    }
    if config.discord.nickname.trim().is_empty() {
        errors.push("discord.nickname is required".to_string());
    }

    // Validate MQTT config
    if config.mqtt.host.is_empty() {
        errors.push("mqtt.host is required".to_string());
    }
    if config.mqtt.port == 0 {
        errors.push("mqtt.port must be non-zero".to_string());
    }
    if config.mqtt.username.is_empty() {
        errors.push("mqtt.username is required".to_string());
    }
    if config.mqtt.password.is_empty() {
        errors.push("mqtt.password is required".to_string());
    }
    if config.mqtt.client_id.is_empty() {
        errors.push("mqtt.client_id is required".to_string());
    }

    // Validate topics
    if config.topics.base.trim_matches('/').is_empty() {
        errors.push("topics.base is required".to_string());
    }
    if config.topics.discovery.trim_matches('/').is_empty() {
        errors.push("topics.discovery is required".to_string());
    }
    for (field, topic) in [
        ("topics.base", &config.topics.base),
        ("topics.discovery", &config.topics.discovery),
    ] {
        if topic.contains('+') || topic.contains('#') {
            errors.push(format!(
                "{} '{}' must not contain MQTT wildcards",
                field, topic
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
