//! Hybrid store: a bounded LRU/TTL cache in front of a persistent engine.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::engine::{Engine, SqliteEngine};
use super::error::{Result, StorageError};
use super::lru::{CacheStats, Lookup, RecencyCache};
use super::options::{StoreOptions, WriteOrder};
use super::traits::Storage;

/// Key-value store that serves fresh reads from memory and keeps every write
/// in a durable engine.
///
/// - Reads check the cache first. A fresh hit is promoted and its freshness
///   window restarts. A stale hit is dropped and treated as a miss.
/// - Misses read the engine and admit the result, evicting the least recently
///   used entry when the cache is full.
/// - Writes go to both layers. [`Storage::keys`] always comes from the engine.
///
/// The cache lock is never held across an engine call. Concurrent operations
/// on the same key are not serialized: two misses may both read the engine,
/// and racing puts leave the cache with whichever admission ran last.
pub struct HybridStore<E: Engine = SqliteEngine> {
  cache: Mutex<RecencyCache>,
  engine: E,
  write_order: WriteOrder,
  open: AtomicBool,
}

impl HybridStore<SqliteEngine> {
  /// Open a SQLite-backed store.
  ///
  /// Fails with [`StorageError::Config`] if no path is configured, before
  /// anything is touched on disk.
  pub fn open(options: StoreOptions) -> Result<Self> {
    let path = options.require_path()?;
    let engine = SqliteEngine::open(path).map_err(|e| StorageError::io_global("open", e))?;
    Ok(Self::with_engine(engine, &options))
  }
}

impl<E: Engine> HybridStore<E> {
  /// Build a store over an already opened engine. The path in `options` is
  /// ignored.
  pub fn with_engine(engine: E, options: &StoreOptions) -> Self {
    info!(
      cache_size = options.cache_size,
      ttl_ms = options.ttl.as_millis() as u64,
      write_order = ?options.write_order,
      "hybrid store ready"
    );
    Self {
      cache: Mutex::new(RecencyCache::new(options.cache_size, options.ttl)),
      engine,
      write_order: options.write_order,
      open: AtomicBool::new(true),
    }
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn is_open(&self) -> bool {
    self.open.load(Ordering::Acquire)
  }

  pub fn stats(&self) -> CacheStats {
    self.cache().stats()
  }

  /// Number of entries currently resident in memory.
  pub fn cached_len(&self) -> usize {
    self.cache().len()
  }

  /// Whether `key` is resident in memory, fresh or not.
  pub fn is_cached(&self, key: &str) -> bool {
    self.cache().contains(key)
  }

  pub fn ttl(&self) -> Duration {
    self.cache().ttl()
  }

  fn cache(&self) -> MutexGuard<'_, RecencyCache> {
    // Poisoning is ignored: the cache holds nothing the engine lacks.
    self.cache.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn ensure_open(&self) -> Result<()> {
    if self.is_open() {
      Ok(())
    } else {
      Err(StorageError::Closed)
    }
  }

  fn admit(&self, key: &str, value: Value) {
    if let Some(evicted) = self.cache().admit(key, value, Instant::now()) {
      debug!(%key, %evicted, "cache full, evicted least recently used entry");
    }
  }

  /// Consult the cache for `key`, logging the outcome.
  fn lookup(&self, key: &str) -> Lookup {
    let lookup = self.cache().lookup(key, Instant::now());
    match &lookup {
      Lookup::Fresh(_) => debug!(%key, "cache hit"),
      Lookup::Stale => debug!(%key, "cache entry stale, evicted"),
      Lookup::Missing => debug!(%key, "cache miss"),
    }
    lookup
  }
}

#[async_trait]
impl<E: Engine> Storage for HybridStore<E> {
  async fn get(&self, key: &str) -> Result<Value> {
    self.ensure_open()?;

    if let Lookup::Fresh(value) = self.lookup(key) {
      return Ok(value);
    }

    let value = self
      .engine
      .get(key)
      .await
      .map_err(|e| StorageError::io("get", key, e))?
      .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

    self.admit(key, value.clone());
    Ok(value)
  }

  async fn put(&self, key: &str, value: Value) -> Result<()> {
    self.ensure_open()?;

    match self.write_order {
      WriteOrder::CacheFirst => {
        self.admit(key, value.clone());
        if let Err(e) = self.engine.put(key, &value).await {
          warn!(%key, error = %e, "durable write failed after cache update");
          return Err(StorageError::io("put", key, e));
        }
      }
      WriteOrder::DurableFirst => {
        self
          .engine
          .put(key, &value)
          .await
          .map_err(|e| StorageError::io("put", key, e))?;
        self.admit(key, value);
      }
    }

    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    self.ensure_open()?;

    let was_cached = self.cache().remove(key);
    if was_cached {
      debug!(%key, "removed from cache");
    }

    self
      .engine
      .delete(key)
      .await
      .map_err(|e| StorageError::io("delete", key, e))
  }

  async fn has(&self, key: &str) -> Result<bool> {
    self.ensure_open()?;

    if let Lookup::Fresh(_) = self.lookup(key) {
      return Ok(true);
    }

    self
      .engine
      .contains(key)
      .await
      .map_err(|e| StorageError::io("has", key, e))
  }

  async fn keys(&self) -> Result<Vec<String>> {
    self.ensure_open()?;

    self
      .engine
      .keys()
      .await
      .map_err(|e| StorageError::io_global("list keys", e))
  }

  async fn close(&self) -> Result<()> {
    if !self.is_open() {
      return Ok(());
    }

    self
      .engine
      .close()
      .await
      .map_err(|e| StorageError::io_global("close", e))?;

    self.open.store(false, Ordering::Release);
    self.cache().clear();
    info!("hybrid store closed");
    Ok(())
  }
}
