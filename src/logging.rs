//! Tracing setup
//!
//! The TUI owns the terminal, so it logs to a daily-rolling file.
//! One-shot CLI commands log to stderr.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,odinchat=debug";
const LOG_FILE_PREFIX: &str = "odinchat.log";

/// Where log records go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Directory for the rolling log file
    File(PathBuf),
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Keep the returned guard alive for the whole process; dropping it stops the
/// background writer and loses buffered records.
pub fn init(target: LogTarget) -> std::io::Result<Option<WorkerGuard>> {
    match target {
        LogTarget::Stderr => {
            // try_init: a second call (tests) keeps the first subscriber
            let _ = tracing_subscriber::registry()
                .with(filter())
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init();
            Ok(None)
        }
        LogTarget::File(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .try_init();
            Ok(Some(guard))
        }
    }
}
