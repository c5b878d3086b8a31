//! Loading the watchdog configuration from disk

use nbwatch_core::config::toml_config::{load_config_from_path, parse_config_file, parse_config_str};
use nbwatch_core::config::MonitorConfig;
use nbwatch_core::error::{ConfigError, WatchError};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

const FULL_CONFIG: &str = r#"
[netbird]
binary = "/usr/local/bin/netbird"
service = "netbird-wt0"

[probe]
hosts = ["db.internal", "10.8.0.1"]
ping_wait_secs = 3

[reconnection]
max_retries = 4
teardown_pause_secs = 1
establish_pause_secs = 8
retry_pause_secs = 6

[notification]
api_base_url = "http://127.0.0.1:8081"
ipv4_only = false
cooldown_minutes = 10

[notification.retry]
max_elapsed_secs = 120
initial_delay_secs = 2.0
backoff_multiplier = 2.0
max_delay_secs = 30.0

[timeouts]
login_secs = 45

[paths]
state_file = "/var/lib/nbwatch/state.json"

[logging]
max_bytes = 1048576
backups = 5

[bot]
allowed_user_id = 862779466
use_sudo = false
"#;

#[test]
fn test_full_file_is_loaded() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    let config = parse_config_file(&path).unwrap();

    assert_eq!(config.netbird.binary, "/usr/local/bin/netbird");
    assert_eq!(config.netbird.service, "netbird-wt0");
    assert_eq!(config.probe.hosts, vec!["db.internal", "10.8.0.1"]);
    assert_eq!(config.reconnection.max_retries, 4);
    assert_eq!(config.reconnection.retry_pause_secs, 6);
    assert_eq!(config.notification.cooldown(), Duration::from_secs(600));
    assert_eq!(config.notification.retry.max_elapsed_secs, 120);
    assert_eq!(config.timeouts.login(), Duration::from_secs(45));
    assert_eq!(config.timeouts.status(), Duration::from_secs(10));
    assert_eq!(
        config.paths.state_file().unwrap(),
        PathBuf::from("/var/lib/nbwatch/state.json")
    );
    assert_eq!(config.logging.backups, 5);
    assert_eq!(config.bot.allowed_user_id, Some(862779466));
    assert!(!config.bot.use_sudo);
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_is_the_default_config() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();

    let config = parse_config_file(&path).unwrap();
    let defaults = MonitorConfig::default();

    assert_eq!(config.netbird, defaults.netbird);
    assert_eq!(config.probe, defaults.probe);
    assert_eq!(config.reconnection, defaults.reconnection);
    assert_eq!(config.notification, defaults.notification);
    assert!(config.bot.use_sudo);
}

#[test]
fn test_secrets_in_file_are_ignored() {
    let config = parse_config_str("[credentials]\nbot_token = \"1:leaked\"\n").unwrap();

    assert!(config.credentials.bot_token.is_none());
}

#[test]
fn test_empty_host_list_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[probe]\nhosts = []\n").unwrap();

    let err = load_config_from_path(&path).unwrap_err();

    assert!(matches!(
        err,
        WatchError::Config(ConfigError::MissingField { ref field }) if field == "probe.hosts"
    ));
}

#[test]
fn test_bad_retry_policy_is_rejected() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[notification.retry]\nbackoff_multiplier = 0.5\n").unwrap();

    let err = load_config_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("retry policy"));
}
