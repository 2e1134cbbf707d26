//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, ResultExt};

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "TOOLPROBE_LOG";

const LOG_FILE_NAME: &str = "toolprobe.log";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/toolprobe/logs/` (or the platform's
/// local data directory). Log level is controlled by `TOOLPROBE_LOG`.
///
/// # Examples
/// ```bash
/// TOOLPROBE_LOG=debug cargo test
/// TOOLPROBE_LOG=toolprobe_detect=trace cargo test
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("toolprobe=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| crate::Error::config(format!("Logging already initialized: {}", e)))?;

    tracing::info!("toolprobe logging to {}", log_dir.display());

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("toolprobe").join("logs")
}

/// Get the log file prefix
///
/// The daily appender never writes this path itself; each day's file is the
/// prefix plus a `.YYYY-MM-DD` (UTC) suffix.
pub fn get_log_file_prefix() -> PathBuf {
    get_log_directory().join(LOG_FILE_NAME)
}
