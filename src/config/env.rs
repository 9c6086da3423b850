//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HASS_DISCORD_TOKEN` - Discord bot token
//! - `HASS_DISCORD_GUILD_ID` - Guild to watch
//! - `HASS_DISCORD_WATCHED_USER_ID` - Member whose voice state is mirrored
//! - `HASS_DISCORD_NICKNAME` - Bot nickname in the guild
//! - `HASS_DISCORD_MQTT_HOST` / `_MQTT_PORT` - Broker address
//! - `HASS_DISCORD_MQTT_USERNAME` / `_MQTT_PASSWORD` - Broker credentials
//! - `HASS_DISCORD_MQTT_CLIENT_ID` - Broker client id suffix
//! - `HASS_DISCORD_TOPIC_BASE` - Base topic
//! - `HASS_DISCORD_TOPIC_DISCOVERY` - Home Assistant discovery prefix

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "HASS_DISCORD";

fn var(name: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}_{}: '{}' is not a valid number", ENV_PREFIX, name, raw);
            None
        }
    }
}

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens and passwords to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    // Discord
    if let Some(token) = var("TOKEN") {
        config.discord.token = token;
    }
    if let Some(id) = parsed("GUILD_ID") {
        config.discord.guild_id = id;
    }
    if let Some(id) = parsed("WATCHED_USER_ID") {
        config.discord.watched_user_id = id;
    }
    if let Some(nickname) = var("NICKNAME") {
        config.discord.nickname = nickname;
    }

    // MQTT
    if let Some(host) = var("MQTT_HOST") {
        config.mqtt.host = host;
    }
    if let Some(port) = parsed("MQTT_PORT") {
        config.mqtt.port = port;
    }
    if let Some(username) = var("MQTT_USERNAME") {
        config.mqtt.username = username;
    }
    if let Some(password) = var("MQTT_PASSWORD") {
        config.mqtt.password = password;
    }
    if let Some(client_id) = var("MQTT_CLIENT_ID") {
        config.mqtt.client_id = client_id;
    }

    // Topics
    if let Some(base) = var("TOPIC_BASE") {
        config.topics.base = base;
    }
    if let Some(discovery) = var("TOPIC_DISCOVERY") {
        config.topics.discovery = discovery;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `HASS_DISCORD_CONFIG` environment variable, otherwise returns "hass-discord-bridge.conf".
pub fn get_config_path() -> String {
    var("CONFIG").unwrap_or_else(|| "hass-discord-bridge.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "HASS_DISCORD");
    }

    #[test]
    fn test_get_config_path_default() {
        env::remove_var("HASS_DISCORD_CONFIG");
        assert_eq!(get_config_path(), "hass-discord-bridge.conf");
    }

    #[test]
    fn test_apply_env_overrides() {
        env::set_var("HASS_DISCORD_TOPIC_DISCOVERY", "ha");
        env::set_var("HASS_DISCORD_MQTT_PORT", "not-a-port");

        let mut config = Config::default();
        config.topics.base = "discord".to_string();
        let result = apply_env_overrides(config);

        assert_eq!(result.topics.discovery, "ha");
        assert_eq!(result.topics.base, "discord");
        // Unparseable values leave the previous setting in place
        assert_eq!(result.mqtt.port, 1883);

        env::remove_var("HASS_DISCORD_TOPIC_DISCOVERY");
        env::remove_var("HASS_DISCORD_MQTT_PORT");
    }
}
