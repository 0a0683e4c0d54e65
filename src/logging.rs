//! Tracing subscriber setup.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Console output plus, when enabled, plain-text output to `log_file`.
///
/// `RUST_LOG` wins over everything; otherwise `--verbose` means `debug` and
/// the configured level applies. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init_logging(
    config: &LogConfig,
    log_file: &Path,
    verbose: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { config.log_level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to build log filter")?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let (file_layer, guard) = if config.enable_file_logging {
        let log_dir = log_file.parent().unwrap_or_else(|| Path::new("."));
        let file_name = log_file
            .file_name()
            .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;
        std::fs::create_dir_all(log_dir).with_context(|| {
            format!("Failed to create log directory: {}", log_dir.display())
        })?;

        let appender = tracing_appender::rolling::never(log_dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
