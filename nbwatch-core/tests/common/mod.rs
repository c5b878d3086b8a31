//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use nbwatch_core::clock::Clock;
use nbwatch_core::config::MonitorConfig;
use nbwatch_core::error::{CommandError, NotifyError};
use nbwatch_core::notify::{BotApi, NotificationTransport, Update};
use nbwatch_core::vpn::{CommandOutput, CommandRunner, CommandSpec};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SSO_PROMPT: &str = "Please do the SSO login in your browser.\n\
If your browser didn't open automatically, use this URL to log in:\n\n\
https://idp.example.com/device?user_code=ABCD-1234\n";

pub const AUTH_URL: &str = "https://idp.example.com/device?user_code=ABCD-1234";

pub fn ok(stdout: &str) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn exit(code: i32, stdout: &str, stderr: &str) -> Result<CommandOutput, CommandError> {
    Ok(CommandOutput {
        exit_code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}

pub fn timeout(command: &str) -> Result<CommandOutput, CommandError> {
    Err(CommandError::Timeout {
        command: command.to_string(),
        seconds: 15,
    })
}

/// Answers commands from per-command-line queues
///
/// Each queue hands out its entries in order and keeps repeating the last
/// one. Unscripted commands fail as if the binary were missing.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<Result<CommandOutput, CommandError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append a response for `command_line`
    pub fn on(&self, command_line: &str, result: Result<CommandOutput, CommandError>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Replace every response for `command_line`
    pub fn set(&self, command_line: &str, result: Result<CommandOutput, CommandError>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(command_line.to_string(), VecDeque::from([result]));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command_line)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = spec.command_line();
        self.calls.lock().unwrap().push(line.clone());

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&line) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(CommandError::NotFound {
                program: spec.program.clone(),
            }),
        }
    }
}

/// Clock whose sleeps return immediately and move time forward
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Self::starting_at(Local.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap())
    }

    pub fn starting_at(start: DateTime<Local>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + chrono::Duration::from_std(by).unwrap();
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn clear_sleeps(&self) {
        self.sleeps.lock().unwrap().clear();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

/// Transport that records deliveries and can fail a number of attempts first
pub struct RecordingTransport {
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn ok() -> Arc<Self> {
        Self::failing_first(0)
    }

    pub fn failing() -> Arc<Self> {
        Self::failing_first(usize::MAX)
    }

    pub fn failing_first(failures: usize) -> Arc<Self> {
        Arc::new(Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != usize::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(NotifyError::Api {
                description: "Bad Gateway".to_string(),
            });
        }

        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Bot API fed with scripted `getUpdates` batches
#[derive(Default)]
pub struct FakeBotApi {
    batches: Mutex<VecDeque<Result<Vec<Update>, NotifyError>>>,
    offsets: Mutex<Vec<i64>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeBotApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_batch(&self, batch: Result<Vec<Update>, NotifyError>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationTransport for FakeBotApi {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl BotApi for FakeBotApi {
    async fn get_updates(&self, offset: i64, _timeout_secs: u64) -> Result<Vec<Update>, NotifyError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Stand-in for the long-poll wait
                tokio::task::yield_now().await;
                Ok(Vec::new())
            }
        }
    }
}

/// Update carrying a text message from `user_id` in chat `chat_id`
pub fn text_update(update_id: i64, user_id: i64, chat_id: i64, text: &str) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": { "id": user_id, "is_bot": false, "username": "operator" },
            "chat": { "id": chat_id, "type": "private" },
            "date": 1748851200,
            "text": text,
        }
    }))
    .unwrap()
}

/// Update without a message, such as an edited message
pub fn empty_update(update_id: i64) -> Update {
    serde_json::from_value(serde_json::json!({ "update_id": update_id })).unwrap()
}

/// Defaults with one probe host, files under `dir` and a configured chat
pub fn test_config(dir: &Path) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.probe.hosts = vec!["gw.internal".to_string()];
    config.paths.state_file = Some(dir.join("state.json"));
    config.paths.log_file = Some(dir.join("watch.log"));
    config.credentials.chat_id = Some("100".to_string());
    config.bot.allowed_user_id = Some(42);
    config
}

pub const STATUS: &str = "netbird status";
pub const PING: &str = "ping -c 1 -W 2 gw.internal";
pub const DOWN: &str = "netbird down";
pub const UP: &str = "netbird up";
pub const LOGIN: &str = "netbird login";

pub const CLIENT_CONNECTED: &str = "Daemon version: 0.28.4\nManagement: Connected\nStatus: Connected\n";
pub const CLIENT_DISCONNECTED: &str = "Daemon version: 0.28.4\nManagement: Disconnected\nStatus: Disconnected\n";

/// Tunnel fully up
pub fn script_vpn_up(runner: &ScriptedRunner) {
    runner.set(STATUS, ok(CLIENT_CONNECTED));
    runner.set(PING, ok("1 packets transmitted, 1 received"));
}

/// Tunnel down and every repair attempt failing without an SSO prompt
pub fn script_vpn_stuck(runner: &ScriptedRunner) {
    runner.set(STATUS, ok(CLIENT_DISCONNECTED));
    runner.set(PING, exit(1, "1 packets transmitted, 0 received", ""));
    runner.set(DOWN, ok("Disconnected"));
    runner.set(UP, exit(1, "", "Error: failed to connect to daemon"));
    runner.set(LOGIN, exit(1, "", "Error: login failed"));
}
