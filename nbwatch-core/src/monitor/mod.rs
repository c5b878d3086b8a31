//! Watchdog run
//!
//! One invocation loads the record, probes the tunnel, reacts according to
//! the previous state, and persists the record exactly once.

use crate::clock::Clock;
use crate::notify::{Notification, Notifier};
use crate::vpn::health_check::StatusProber;
use crate::vpn::reconnection::ReconnectController;
use crate::vpn::state::ConnectivityState;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod record;

pub use record::{MonitorRecord, StateStore};

/// What one run observed and did
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Verdict of the first probe of the run
    pub connected: bool,

    /// State loaded at the start of the run
    pub previous: ConnectivityState,

    /// Record as persisted at the end of the run
    pub record: MonitorRecord,

    /// Notifications attempted, in order
    pub notifications: Vec<Notification>,
}

impl RunSummary {
    /// 0 when the tunnel was up at the start of the run
    pub fn exit_code(&self) -> u8 {
        if self.connected {
            0
        } else {
            1
        }
    }
}

/// The watchdog state machine
pub struct Monitor {
    prober: StatusProber,
    reconnector: ReconnectController,
    notifier: Notifier,
    store: StateStore,
    clock: Arc<dyn Clock>,
    cooldown: Duration,
}

impl Monitor {
    pub fn new(
        prober: StatusProber,
        reconnector: ReconnectController,
        notifier: Notifier,
        store: StateStore,
        clock: Arc<dyn Clock>,
        cooldown: Duration,
    ) -> Self {
        Self {
            prober,
            reconnector,
            notifier,
            store,
            clock,
            cooldown,
        }
    }

    /// Perform one check-and-repair cycle
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> RunSummary {
        let mut record = self.store.load();
        let previous = record.last_status;
        let mut sent = Vec::new();

        info!("Checking VPN (previous state: {})", previous);
        let connected = self.prober.is_connected().await;

        if connected {
            if previous.is_down() {
                info!("VPN recovered");
                self.dispatch(&mut record, Notification::Recovered, &mut sent)
                    .await;
            } else {
                info!("VPN is up");
            }
            record.mark_connected();
            record.reconnect_count = 0;
        } else if previous == ConnectivityState::AuthRequired {
            self.handle_pending_auth(&mut record, &mut sent).await;
        } else {
            self.handle_outage(previous, &mut record, &mut sent).await;
        }

        record.last_check = Some(self.clock.now());
        if let Err(e) = self.store.save(&record) {
            error!("Failed to save state: {}", e);
        }

        RunSummary {
            connected,
            previous,
            record,
            notifications: sent,
        }
    }

    /// Still waiting on a human to log in; only refresh the link
    async fn handle_pending_auth(&self, record: &mut MonitorRecord, sent: &mut Vec<Notification>) {
        warn!("VPN still requires authorization");

        match self.reconnector.fetch_auth_url().await {
            Some(auth_url) => {
                self.dispatch(record, Notification::AuthRequired { auth_url }, sent)
                    .await;
            }
            None => warn!("Could not obtain a fresh auth URL"),
        }

        record.mark_failed(ConnectivityState::AuthRequired);
    }

    async fn handle_outage(
        &self,
        previous: ConnectivityState,
        record: &mut MonitorRecord,
        sent: &mut Vec<Notification>,
    ) {
        warn!("VPN is down");

        if previous != ConnectivityState::Disconnected {
            self.dispatch(record, Notification::Disconnect, sent).await;
        }

        let outcome = self.reconnector.reconnect_default().await;

        if outcome.succeeded {
            let note = Notification::ReconnectSuccess {
                attempt: outcome.attempt_number,
                max_attempts: self.reconnector.policy().max_retries,
            };
            self.dispatch(record, note, sent).await;
            record.reconnect_count = record.reconnect_count.saturating_add(1);
            record.mark_connected();
        } else if let Some(auth_url) = outcome.auth_url {
            self.dispatch(record, Notification::AuthRequired { auth_url }, sent)
                .await;
            record.mark_failed(ConnectivityState::AuthRequired);
        } else {
            let note = Notification::ReconnectFailure {
                attempts: outcome.attempt_number,
            };
            self.dispatch(record, note, sent).await;
            record.mark_failed(ConnectivityState::Disconnected);
        }
    }

    /// Send `note` unless it is a problem report still inside the cooldown
    async fn dispatch(
        &self,
        record: &mut MonitorRecord,
        note: Notification,
        sent: &mut Vec<Notification>,
    ) {
        if !note.is_recovery() && !record.cooldown_elapsed(self.clock.now(), self.cooldown) {
            debug!("The {} notification was suppressed by cooldown", note.kind());
            return;
        }

        self.send(record, note, sent).await;
    }

    async fn send(
        &self,
        record: &mut MonitorRecord,
        note: Notification,
        sent: &mut Vec<Notification>,
    ) {
        let now = self.clock.now();
        record.mark_notified(now);

        if !self.notifier.notify(&note.render(now)).await {
            warn!("The {} notification was not delivered", note.kind());
        }
        sent.push(note);
    }
}
