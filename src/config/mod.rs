//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::warn;

use crate::common::error::ConfigError;

pub use parser::load_config;
pub use types::*;
pub use validate::validate_config;

/// Load the config file (if present), apply environment overrides and validate.
///
/// A missing file is not an error: every setting can come from the environment.
pub fn load_and_validate(path: &str) -> Result<BridgeConfig, ConfigError> {
    let config = if Path::new(path).exists() {
        load_config(path)?
    } else {
        warn!("Config file {} not found, using environment only", path);
        Config::default()
    };

    let config = env::apply_env_overrides(config);
    validate_config(&config)?;
    Ok(BridgeConfig::from(config))
}
