use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. HTTP and scheduler internals stay quiet.
pub const DEFAULT_FILTER: &str =
    "info,hyper=warn,reqwest=warn,h2=warn,rustls=warn,tokio_cron_scheduler=warn";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Monthly log file name, e.g. `2025-09.log`.
pub fn log_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("{}.log", now.format("%Y-%m"))
}

/// Logs to stdout and to `<log_dir>/<YYYY-MM>.log`.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the life of the process.
pub fn init(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender =
        tracing_appender::rolling::never(log_dir, log_file_name(chrono::Utc::now()));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = fmt::layer()
        .with_timer(ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_writer(std::io::stdout);

    let file_layer = fmt::layer()
        .with_timer(ChronoUtc::new(TIMESTAMP_FORMAT.to_string()))
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
