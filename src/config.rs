use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::{StoreOptions, WriteOrder, DEFAULT_CACHE_SIZE, DEFAULT_TTL};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Database file (defaults to $XDG_DATA_HOME/peerstore/store.db)
  pub path: Option<PathBuf>,
  #[serde(default = "default_cache_size")]
  pub cache_size: usize,
  #[serde(default = "default_ttl_ms")]
  pub ttl_ms: u64,
  #[serde(default)]
  pub write_order: WriteOrder,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      path: None,
      cache_size: default_cache_size(),
      ttl_ms: default_ttl_ms(),
      write_order: WriteOrder::default(),
    }
  }
}

fn default_cache_size() -> usize {
  DEFAULT_CACHE_SIZE
}

fn default_ttl_ms() -> u64 {
  DEFAULT_TTL.as_millis() as u64
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when PEERSTORE_LOG / RUST_LOG are unset
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "warn".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./peerstore.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/peerstore/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("peerstore.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("peerstore").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Resolve the store section into options, filling in the default path.
  pub fn store_options(&self) -> Result<StoreOptions> {
    let path = match &self.store.path {
      Some(p) => p.clone(),
      None => Self::default_store_path()?,
    };

    Ok(
      StoreOptions::new(path)
        .with_cache_size(self.store.cache_size)
        .with_ttl(Duration::from_millis(self.store.ttl_ms))
        .with_write_order(self.store.write_order),
    )
  }

  /// Get the default database path
  pub fn default_store_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("peerstore").join("store.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_document_uses_defaults() {
    let config = Config::parse("{}").unwrap();
    assert_eq!(config.store.cache_size, 1000);
    assert_eq!(config.store.ttl_ms, 3_600_000);
    assert_eq!(config.store.write_order, WriteOrder::CacheFirst);
    assert_eq!(config.log.level, "warn");
    assert!(config.log.file.is_none());
  }

  #[test]
  fn test_full_document() {
    let config = Config::parse(
      r#"
store:
  path: /var/lib/peerstore/store.db
  cache_size: 64
  ttl_ms: 500
  write_order: durable_first
log:
  level: debug
  file: /tmp/peerstore.log
"#,
    )
    .unwrap();

    let options = config.store_options().unwrap();
    assert_eq!(
      options.path.as_deref(),
      Some(Path::new("/var/lib/peerstore/store.db"))
    );
    assert_eq!(options.cache_size, 64);
    assert_eq!(options.ttl, Duration::from_millis(500));
    assert_eq!(options.write_order, WriteOrder::DurableFirst);
    assert_eq!(config.log.level, "debug");
  }

  #[test]
  fn test_unknown_write_order_is_rejected() {
    assert!(Config::parse("store:\n  write_order: sometimes\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    assert!(Config::load(Some(missing.as_path())).is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peerstore.yaml");
    std::fs::write(&path, "store:\n  cache_size: 7\n").unwrap();

    let config = Config::load(Some(path.as_path())).unwrap();
    assert_eq!(config.store.cache_size, 7);
  }
}
