//! Error types for the store and its persistent engines.

/// Errors reported by a persistent engine.
///
/// A missing key is never an engine error: engines report absence as
/// `Ok(None)` / `Ok(false)` so callers can tell it apart from real failures.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// SQLite rejected the statement or the connection failed.
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A stored value could not be encoded or decoded.
  #[error("value codec error: {0}")]
  Codec(#[from] serde_json::Error),

  /// Filesystem error while preparing the database location.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// A stored row did not have the expected shape.
  #[error("malformed stored data: {0}")]
  Malformed(String),

  /// The blocking task running the engine call panicked or was cancelled.
  #[error("engine task failed: {0}")]
  Task(String),

  /// The engine was used after it was closed.
  #[error("engine is closed")]
  Closed,
}

/// Errors surfaced through the [`Storage`](super::Storage) contract.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  /// A required construction parameter is missing or invalid.
  #[error("invalid store configuration: {0}")]
  Config(String),

  /// The store has been closed and must not be reused.
  #[error("store is closed")]
  Closed,

  /// The key is absent from both the cache and the persistent engine.
  #[error("key not found: {0}")]
  NotFound(String),

  /// The persistent engine failed for a reason other than a missing key.
  #[error("failed to {op}{}: {source}", key_suffix(.key))]
  Io {
    op: &'static str,
    key: Option<String>,
    #[source]
    source: EngineError,
  },

  /// A typed value could not be converted to or from its stored JSON form.
  #[error("failed to convert value for key '{key}': {source}")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

impl StorageError {
  /// Wrap an engine failure for an operation on a single key.
  pub fn io(op: &'static str, key: &str, source: EngineError) -> Self {
    Self::Io {
      op,
      key: Some(key.to_string()),
      source,
    }
  }

  /// Wrap an engine failure for an operation that is not tied to a key.
  pub fn io_global(op: &'static str, source: EngineError) -> Self {
    Self::Io {
      op,
      key: None,
      source,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound(_))
  }

  pub fn is_closed(&self) -> bool {
    matches!(self, Self::Closed)
  }
}

fn key_suffix(key: &Option<String>) -> String {
  match key {
    Some(k) => format!(" '{}'", k),
    None => String::new(),
  }
}

/// Result alias for store operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
