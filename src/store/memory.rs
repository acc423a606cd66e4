//! Purely in-memory [`Storage`] implementation.
//!
//! Nothing survives the process. Useful for tests of components that consume
//! the storage contract, and for ephemeral nodes that do not need durability.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::{Result, StorageError};
use super::traits::Storage;

#[derive(Debug)]
pub struct MemoryStore {
  data: Mutex<BTreeMap<String, Value>>,
  open: AtomicBool,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self {
      data: Mutex::new(BTreeMap::new()),
      open: AtomicBool::new(true),
    }
  }

  fn data(&self) -> Result<MutexGuard<'_, BTreeMap<String, Value>>> {
    if !self.open.load(Ordering::Acquire) {
      return Err(StorageError::Closed);
    }
    Ok(self.data.lock().unwrap_or_else(PoisonError::into_inner))
  }
}

#[async_trait]
impl Storage for MemoryStore {
  async fn get(&self, key: &str) -> Result<Value> {
    self
      .data()?
      .get(key)
      .cloned()
      .ok_or_else(|| StorageError::NotFound(key.to_string()))
  }

  async fn put(&self, key: &str, value: Value) -> Result<()> {
    self.data()?.insert(key.to_string(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<()> {
    self.data()?.remove(key);
    Ok(())
  }

  async fn has(&self, key: &str) -> Result<bool> {
    Ok(self.data()?.contains_key(key))
  }

  async fn keys(&self) -> Result<Vec<String>> {
    Ok(self.data()?.keys().cloned().collect())
  }

  async fn close(&self) -> Result<()> {
    if self.open.swap(false, Ordering::AcqRel) {
      self
        .data
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
    }
    Ok(())
  }
}
