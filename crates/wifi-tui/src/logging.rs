//! Logging setup.
//!
//! The TUI owns the terminal, so in TUI mode events go to a log file through
//! a non-blocking writer. Headless runs log to stderr.

use crate::config::LogConfig;
use anyhow::{Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file name inside the log directory.
pub const LOG_FILE: &str = "wifi-tui.log";

/// Where log events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error, for headless runs
    Stderr,
    /// A file in the configured directory, for TUI runs
    File,
}

fn build_filter(config: &LogConfig, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if verbose {
        return EnvFilter::new("wifi_tui=debug");
    }
    EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("wifi_tui=info"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init(config: &LogConfig, target: LogTarget, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config, verbose);

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .try_init()
                .context("Failed to install log subscriber")?;
            Ok(None)
        }
        LogTarget::File => {
            let dir = config.directory();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .try_init()
                .context("Failed to install log subscriber")?;

            info!("Logging to {}", dir.join(LOG_FILE).display());
            Ok(Some(guard))
        }
    }
}
