//! External command execution
//!
//! Every binary the watchdog touches (`netbird`, `ping`, `systemctl`) runs
//! through [`CommandRunner`] with its own timeout. Failures come back as
//! [`CommandError`] values; nothing here panics or aborts the run.

use crate::error::CommandError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A program, its arguments and how long it may run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Prefix the command with `sudo` when `elevated` is set
    pub fn elevated(self, elevated: bool) -> Self {
        if !elevated {
            return self;
        }

        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);

        Self {
            program: "sudo".to_string(),
            args,
            timeout: self.timeout,
        }
    }

    /// Shell-style rendering used in logs and test scripts
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, absent when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, the way the client's messages are scanned
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    #[tracing::instrument(skip(self), fields(command = %spec.command_line(), timeout_secs = spec.timeout.as_secs()))]
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future on timeout must not leave the child behind
            .kill_on_drop(true);

        let output = match tokio::time::timeout(spec.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::NotFound {
                    program: spec.program.clone(),
                });
            }
            Ok(Err(e)) => {
                return Err(CommandError::SpawnFailed {
                    command: spec.command_line(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: spec.command_line(),
                    seconds: spec.timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(exit_code = ?result.exit_code, "Command finished");
        Ok(result)
    }
}
