//! Logging infrastructure for tradecore
//!
//! Logs go to `~/.local/state/tradecore/tradecore.<date>.log`, one file per
//! UTC day, with old days pruned.

use crate::config::{Config, LoggingConfig};
use crate::error::Error;
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_PREFIX: &str = "tradecore";
const LOG_SUFFIX: &str = "log";

/// HTTP stack crates that are chatty at debug level.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory
/// - Daily rotation keeping `max_files` days
/// - Level from config or RUST_LOG, with the HTTP stack held at `warn`
///
/// Nothing is written to stdout so chat output stays clean.
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    std::fs::create_dir_all(&log_dir)?;

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX);
    if config.max_files > 0 {
        builder = builder.max_log_files(config.max_files);
    }
    let file_appender = builder
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("cannot open log file: {}", e)))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Filter for a configured level. HTTP crates never log below `warn`.
pub fn filter_directives(level: &str) -> String {
    let mut directives = level.trim().to_string();
    for target in QUIET_TARGETS {
        directives.push_str(&format!(",{}=warn", target));
    }
    directives
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

fn log_file_name(day: NaiveDate) -> String {
    format!("{}.{}.{}", LOG_PREFIX, day.format("%Y-%m-%d"), LOG_SUFFIX)
}

/// Path of today's log file
pub fn log_file_path() -> PathBuf {
    Config::state_dir().join(log_file_name(Utc::now().date_naive()))
}
