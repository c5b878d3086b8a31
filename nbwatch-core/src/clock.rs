//! Time source abstraction
//!
//! Every pause and every elapsed-time decision goes through [`Clock`] so
//! the reconnect loop, the notifier budget and the cooldown can be driven
//! by a manual clock in tests.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Wall-clock reading plus a way to wait
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local time
    fn now(&self) -> DateTime<Local>;

    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Real time backed by the system clock and the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Seconds elapsed between two readings, never negative
pub fn elapsed_secs(since: DateTime<Local>, now: DateTime<Local>) -> f64 {
    let millis = (now - since).num_milliseconds();
    (millis.max(0) as f64) / 1000.0
}
