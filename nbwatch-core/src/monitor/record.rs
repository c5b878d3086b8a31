//! Persisted watchdog state
//!
//! One small JSON document, read at the start of every run and written
//! back once at the end. Missing keys take their defaults so older files
//! keep loading.

use crate::clock::elapsed_secs;
use crate::error::StateError;
use crate::vpn::state::ConnectivityState;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

/// What the watchdog remembers between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorRecord {
    /// End of the previous run
    #[serde(with = "opt_timestamp")]
    pub last_check: Option<DateTime<Local>>,

    /// Outcome of the previous run
    pub last_status: ConnectivityState,

    /// Last time a notification was attempted
    #[serde(with = "opt_timestamp")]
    pub last_notification_time: Option<DateTime<Local>>,

    /// Successful automatic reconnects
    pub reconnect_count: u32,

    /// Runs in a row that ended down
    pub consecutive_failures: u32,
}

impl MonitorRecord {
    /// Whether the notification cooldown has passed
    ///
    /// A record that never notified is always past its cooldown.
    pub fn cooldown_elapsed(&self, now: DateTime<Local>, cooldown: Duration) -> bool {
        match self.last_notification_time {
            None => true,
            Some(last) => elapsed_secs(last, now) >= cooldown.as_secs_f64(),
        }
    }

    /// Record a notification at `now`; the timestamp never moves backwards
    pub fn mark_notified(&mut self, now: DateTime<Local>) {
        self.last_notification_time = Some(match self.last_notification_time {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    /// Enter `connected`, clearing the failure streak
    pub fn mark_connected(&mut self) {
        self.last_status = ConnectivityState::Connected;
        self.consecutive_failures = 0;
    }

    /// End a run down in `status`
    pub fn mark_failed(&mut self, status: ConnectivityState) {
        self.last_status = status;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }
}

/// Reads and writes the record file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, falling back to defaults on any problem
    pub fn load(&self) -> MonitorRecord {
        match self.try_load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No state file at {}, starting fresh", self.path.display());
                MonitorRecord::default()
            }
            Err(e) => {
                error!("Failed to load state: {}", e);
                MonitorRecord::default()
            }
        }
    }

    /// Load the record; `Ok(None)` when the file does not exist
    pub fn try_load(&self) -> Result<Option<MonitorRecord>, StateError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::ReadFailed {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StateError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Write the record atomically: temp file in the same directory, then rename
    pub fn save(&self, record: &MonitorRecord) -> Result<(), StateError> {
        let write_failed = |reason: String| StateError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(record).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            write_failed(e.to_string())
        })?;

        debug!("State saved to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Optional local timestamps
///
/// Written as RFC 3339 with offset. Offset-less ISO timestamps are read
/// as local time.
mod opt_timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Local>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).map_err(de::Error::custom)).transpose()
    }

    pub(super) fn parse(raw: &str) -> Result<DateTime<Local>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Local));
        }

        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| format!("timestamp {:?} does not exist in local time", raw))
    }
}
