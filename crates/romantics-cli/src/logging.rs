use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/romantics.log";

/// `TRACING_LEVEL` wins; otherwise each `-v` raises the level one step.
fn filter_directive(env_level: Option<String>, verbosity: u8) -> String {
    match env_level {
        Some(level) if !level.trim().is_empty() => level,
        _ => match verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string(),
    }
}

/// Where the file log goes, as (directory, file name). An empty
/// `LOG_FILE_PATH` turns the file log off.
fn log_file_target(env_path: Option<String>) -> Option<(PathBuf, PathBuf)> {
    let raw = env_path.unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    if raw.trim().is_empty() {
        return None;
    }
    let path = Path::new(&raw);
    let file_name = path.file_name()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, PathBuf::from(file_name)))
}

/// Compact stderr logging plus an optional plain-text file log. Keep the
/// returned guard alive until exit or the tail of the file log is lost.
pub fn init_logger(verbosity: u8) -> Option<WorkerGuard> {
    let filter_layer = EnvFilter::new(filter_directive(env::var("TRACING_LEVEL").ok(), verbosity));
    let target = log_file_target(env::var("LOG_FILE_PATH").ok());

    let (file_layer, guard) = match &target {
        Some((dir, file_name)) => {
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .without_time(),
        )
        .with(file_layer)
        .with(filter_layer)
        .init();

    match &target {
        Some((dir, file_name)) => debug!("Logging to {}", dir.join(file_name).display()),
        None => debug!("File log disabled"),
    }

    guard
}
