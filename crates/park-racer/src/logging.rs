//! Tracing setup: stderr always, plus an optional log file.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns the file writer's guard when
/// `log_dir` is given; it must outlive all logging.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    match log_dir {
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(env_filter())
                .try_init()
                .ok();
            Ok(None)
        }
        Some(dir) => {
            let (writer, guard) = create_log_writer(dir)?;
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .ok();
            Ok(Some(guard))
        }
    }
}

/// Create a run-specific log writer at `{log_dir}/racer-{timestamp}.log`.
///
/// Returns a non-blocking writer and the worker guard that flushes it.
pub fn create_log_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_name = format!("racer-{}.log", Local::now().format("%Y%m%d-%H%M%S"));
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    Ok((non_blocking, guard))
}
