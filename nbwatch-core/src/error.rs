//! Error types for the nbwatch VPN watchdog
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the nbwatch application
#[derive(Error, Debug)]
pub enum WatchError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors from running external commands
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Errors from the notification transport
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Errors reading or writing the monitor state file
    #[error("State file error: {0}")]
    State(#[from] StateError),

    /// Logging could not be initialised
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Invalid Telegram API URL: {url}")]
    InvalidUrl { url: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Failures of an external command invocation
///
/// None of these are fatal: callers log them and treat the probe or step
/// as failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {program}")]
    NotFound { program: String },

    #[error("`{command}` timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    #[error("Failed to run `{command}`: {reason}")]
    SpawnFailed { command: String, reason: String },
}

/// Notification transport errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Telegram credentials are not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {description}")]
    Api { description: String },

    #[error("Malformed Telegram response: {0}")]
    InvalidResponse(String),
}

/// Monitor state file errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read state file {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write state file {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("State file {path} is not valid JSON: {reason}")]
    Corrupt { path: String, reason: String },
}
