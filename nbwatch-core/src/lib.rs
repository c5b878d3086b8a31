//! Core library for the nbwatch netbird watchdog
//!
//! This crate provides connectivity probing, automatic reconnection,
//! Telegram notifications with a persisted cooldown, and a small
//! remote-control bot.

pub mod error;
pub mod types;

pub mod bot;
pub mod clock;
pub mod config;
pub mod context;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod vpn;

pub use context::MonitorContext;
pub use logging::{init_logging, install_panic_hook, panic_message};
