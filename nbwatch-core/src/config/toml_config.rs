//! TOML configuration file I/O
//!
//! Handles locating and loading the watchdog configuration from the
//! user's configuration directory.

use crate::config::MonitorConfig;
use crate::error::{ConfigError, WatchError};
use std::path::{Path, PathBuf};

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the invoking user's home directory
///
/// When run through sudo the state and logs still belong to the real user,
/// so `SUDO_USER` wins over `HOME`.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user))
    } else {
        std::env::var("HOME").map_err(|_| ConfigError::IoError {
            message: "HOME environment variable not set".to_string(),
        })?
    };

    Ok(PathBuf::from(home))
}

/// Get the default configuration directory
///
/// Returns ~/.config/nbwatch, or NBWATCH_CONFIG_DIR if set
pub fn get_config_dir() -> Result<PathBuf, WatchError> {
    if let Ok(config_dir) = std::env::var("NBWATCH_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    Ok(home_dir()?.join(".config").join("nbwatch"))
}

/// Get the default configuration file path
pub fn get_config_path() -> Result<PathBuf, WatchError> {
    let config_dir = get_config_dir()?;
    Ok(config_dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default location
///
/// A missing file yields the defaults; environment values are applied
/// and the result is validated either way.
pub fn load_config() -> Result<MonitorConfig, WatchError> {
    let config_path = get_config_path()?;

    let mut config = if config_path.exists() {
        parse_config_file(&config_path)?
    } else {
        MonitorConfig::default()
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit path, which must exist
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<MonitorConfig, WatchError> {
    let mut config = parse_config_file(path.as_ref())?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

/// Parse a configuration file without touching the environment
pub fn parse_config_file(path: &Path) -> Result<MonitorConfig, WatchError> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WatchError::Config(ConfigError::LoadFailed {
            path: path.to_string_lossy().to_string(),
        }),
        _ => WatchError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    parse_config_str(&contents)
}

/// Parse configuration text
pub fn parse_config_str(contents: &str) -> Result<MonitorConfig, WatchError> {
    toml::from_str(contents).map_err(|e| {
        WatchError::Config(ConfigError::ValidationError {
            message: format!("Failed to parse config file: {}", e),
        })
    })
}
