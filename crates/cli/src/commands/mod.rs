//! Subcommand implementations.

pub mod classify;
pub mod config_cmd;
pub mod pack;
pub mod run;

use memoforge_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

/// Path of the config file in use.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config from `explicit` or the default location, then apply
/// environment overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = explicit else {
        return AppConfig::load();
    };
    let mut config = AppConfig::load_from(path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}
