//! The storage contract shared by every store implementation.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::error::{Result, StorageError};

/// Key-value storage capability set.
///
/// Consumers (peer registry, relay bookkeeping) depend on this trait only, so
/// the engine behind it can be swapped without touching them. Every operation
/// fails with [`StorageError::Closed`] once [`Storage::close`] has completed.
#[async_trait]
pub trait Storage: Send + Sync {
  /// Fetch the value for `key`.
  ///
  /// Fails with [`StorageError::NotFound`] if the key does not exist.
  async fn get(&self, key: &str) -> Result<Value>;

  /// Store `value` under `key`, replacing any previous value.
  async fn put(&self, key: &str, value: Value) -> Result<()>;

  /// Remove `key`. Removing a missing key succeeds.
  async fn delete(&self, key: &str) -> Result<()>;

  /// Whether `key` exists. Absence is `Ok(false)`, never an error.
  async fn has(&self, key: &str) -> Result<bool>;

  /// All durably stored keys, recomputed on every call.
  async fn keys(&self) -> Result<Vec<String>>;

  /// Release the store. Calling it again is a no-op.
  async fn close(&self) -> Result<()>;
}

/// Typed helpers over any [`Storage`], converting through JSON values.
#[async_trait]
pub trait StorageExt: Storage {
  /// Fetch `key` and deserialize it into `T`.
  async fn get_as<T>(&self, key: &str) -> Result<T>
  where
    T: DeserializeOwned + Send,
  {
    let value = self.get(key).await?;
    serde_json::from_value(value).map_err(|source| StorageError::Serialization {
      key: key.to_string(),
      source,
    })
  }

  /// Serialize `value` and store it under `key`.
  async fn put_as<T>(&self, key: &str, value: &T) -> Result<()>
  where
    T: Serialize + Sync + ?Sized,
  {
    let value = serde_json::to_value(value).map_err(|source| StorageError::Serialization {
      key: key.to_string(),
      source,
    })?;
    self.put(key, value).await
  }
}

impl<S: Storage + ?Sized> StorageExt for S {}
