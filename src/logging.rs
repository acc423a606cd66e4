//! Tracing subscriber setup for the command-line tool.

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "PEERSTORE_LOG";

/// Install the global subscriber.
///
/// Logs go to stderr unless `config.file` is set, in which case they are
/// appended to that file through a non-blocking writer. The returned guard
/// must be held until exit so buffered lines are flushed.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
  let filter = build_filter(config)?;

  match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install logger: {}", e))?;
      Ok(None)
    }
  }
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
  let directive = std::env::var(LOG_ENV)
    .or_else(|_| std::env::var("RUST_LOG"))
    .unwrap_or_else(|_| config.level.clone());

  EnvFilter::try_new(&directive).map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))
}
