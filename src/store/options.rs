//! Construction options for [`HybridStore`](super::HybridStore).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{Result, StorageError};

/// Default maximum number of resident cache entries.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

/// Default freshness window for cached entries (one hour).
pub const DEFAULT_TTL: Duration = Duration::from_millis(3_600_000);

/// Order in which `put` updates the two layers.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteOrder {
  /// Admit to the cache, then write durably. A failed durable write leaves
  /// the new value cached until it is evicted or goes stale.
  #[default]
  CacheFirst,
  /// Write durably, then admit to the cache only if the write succeeded.
  DurableFirst,
}

/// Options accepted when opening a store.
#[derive(Debug, Clone)]
pub struct StoreOptions {
  /// Location of the durable database. Required.
  pub path: Option<PathBuf>,
  /// Maximum resident cache entries. Zero disables caching.
  pub cache_size: usize,
  /// How long a cached entry stays fresh after its last access.
  pub ttl: Duration,
  pub write_order: WriteOrder,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      path: None,
      cache_size: DEFAULT_CACHE_SIZE,
      ttl: DEFAULT_TTL,
      write_order: WriteOrder::default(),
    }
  }
}

impl StoreOptions {
  /// Options for a store at `path` with default cache settings.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
      ..Self::default()
    }
  }

  pub fn with_cache_size(mut self, cache_size: usize) -> Self {
    self.cache_size = cache_size;
    self
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn with_write_order(mut self, write_order: WriteOrder) -> Self {
    self.write_order = write_order;
    self
  }

  /// The configured database path, or a config error if it is missing or empty.
  pub fn require_path(&self) -> Result<&Path> {
    match self.path.as_deref() {
      Some(p) if !p.as_os_str().is_empty() => Ok(p),
      _ => Err(StorageError::Config(
        "a persistent store path is required".to_string(),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let options = StoreOptions::default();
    assert_eq!(options.cache_size, 1000);
    assert_eq!(options.ttl, Duration::from_secs(3600));
    assert_eq!(options.write_order, WriteOrder::CacheFirst);
  }

  #[test]
  fn test_missing_path_is_config_error() {
    let err = StoreOptions::default().require_path().unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
  }

  #[test]
  fn test_empty_path_is_config_error() {
    let err = StoreOptions::new("").require_path().unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
  }

  #[test]
  fn test_builder_overrides() {
    let options = StoreOptions::new("/tmp/peers.db")
      .with_cache_size(2)
      .with_ttl(Duration::from_millis(100))
      .with_write_order(WriteOrder::DurableFirst);
    assert_eq!(options.require_path().unwrap(), Path::new("/tmp/peers.db"));
    assert_eq!(options.cache_size, 2);
    assert_eq!(options.ttl, Duration::from_millis(100));
    assert_eq!(options.write_order, WriteOrder::DurableFirst);
  }
}
