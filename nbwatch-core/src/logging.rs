//! Logging setup
//!
//! Events go to a size-rotated log file as `[YYYY-MM-DD HH:MM:SS] LEVEL: message`
//! and to stderr as `[LEVEL] message`. Under systemd the journal replaces
//! stderr. `RUST_LOG` overrides the default `info` filter.

use crate::config::LogConfig;
use crate::error::WatchError;
use chrono::Local;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Size-rotated log file; backups are `<file>.1` (newest) to `<file>.N`
pub fn rotating_log_file(config: &LogConfig, path: &Path) -> Result<FileRotate<AppendCount>, WatchError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            WatchError::Logging(format!("cannot create log directory {}: {}", parent.display(), e))
        })?;
    }

    let max_bytes = usize::try_from(config.max_bytes).unwrap_or(usize::MAX);

    Ok(FileRotate::new(
        path,
        AppendCount::new(config.backups as usize),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

/// Single-line event format shared by the file and the console
#[derive(Debug, Clone, Copy)]
pub struct LineFormat {
    timestamps: bool,
}

impl LineFormat {
    /// `[YYYY-MM-DD HH:MM:SS] LEVEL: message`
    pub fn file() -> Self {
        Self { timestamps: true }
    }

    /// `[LEVEL] message`
    pub fn console() -> Self {
        Self { timestamps: false }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();

        if self.timestamps {
            write!(writer, "[{}] {}: ", Local::now().format("%Y-%m-%d %H:%M:%S"), level)?;
        } else {
            write!(writer, "[{}] ", level)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Route panics through `tracing` so they reach the log file with a backtrace
///
/// The previous hook still runs afterwards.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let backtrace = std::backtrace::Backtrace::force_capture();

        tracing::error!(
            "Panic at {}: {}\n{}",
            location,
            panic_message(info.payload()),
            backtrace
        );
        previous(info);
    }));
}

/// Text carried by a panic payload
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop, so it must live
/// until the process exits.
pub fn init_logging(config: &LogConfig, log_file: &Path) -> Result<WorkerGuard, WatchError> {
    let (file_writer, guard) = tracing_appender::non_blocking(rotating_log_file(config, log_file)?);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .event_format(LineFormat::file());

    // Under systemd the journal takes the place of stderr
    let journal_layer = if std::env::var_os("JOURNAL_STREAM").is_some() {
        match tracing_journald::layer() {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("journald unavailable, logging to stderr: {}", e);
                None
            }
        }
    } else {
        None
    };

    let console_layer = journal_layer.is_none().then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(false)
            .event_format(LineFormat::console())
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .with(journal_layer)
        .try_init()
        .map_err(|e| WatchError::Logging(e.to_string()))?;

    Ok(guard)
}
