//! Persistent engine trait and the SQLite implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::error::{EngineError, Result};

/// Durable key-value engine behind the hybrid store.
///
/// Engines are the system of record: they never expire or evict data. A
/// missing key is reported as `Ok(None)` / `Ok(false)`, never as an error.
#[async_trait]
pub trait Engine: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<Value>, EngineError>;

  async fn put(&self, key: &str, value: &Value) -> Result<(), EngineError>;

  /// Remove `key`. A missing key is not an error.
  async fn delete(&self, key: &str) -> Result<(), EngineError>;

  async fn contains(&self, key: &str) -> Result<bool, EngineError>;

  async fn keys(&self) -> Result<Vec<String>, EngineError>;

  async fn close(&self) -> Result<(), EngineError>;
}

/// Schema for the key-value table.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed persistent engine.
///
/// The connection sits behind a mutex and every call runs on the blocking
/// pool, so engine calls are the only points where a store operation yields.
#[derive(Clone)]
pub struct SqliteEngine {
  conn: Arc<Mutex<Option<Connection>>>,
  path: PathBuf,
}

impl SqliteEngine {
  /// Open or create the database at `path`, creating parent directories.
  pub fn open(path: &Path) -> Result<Self, EngineError> {
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    info!(path = %path.display(), "opened persistent store");

    Ok(Self {
      conn: Arc::new(Mutex::new(Some(conn))),
      path: path.to_path_buf(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// When `key` was last written, if it exists.
  pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, EngineError> {
    let key = key.to_string();
    let raw = self
      .with_conn(move |conn| {
        conn
          .query_row(
            "SELECT updated_at FROM kv WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
          )
          .optional()
          .map_err(EngineError::from)
      })
      .await?;

    raw.map(|s| parse_datetime(&s)).transpose()
  }

  /// Run `f` against the open connection on the blocking pool.
  async fn with_conn<T, F>(&self, f: F) -> Result<T, EngineError>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, EngineError> + Send + 'static,
  {
    let conn = Arc::clone(&self.conn);
    tokio::task::spawn_blocking(move || -> Result<T, EngineError> {
      let guard = conn
        .lock()
        .map_err(|e| EngineError::Task(format!("lock poisoned: {}", e)))?;
      match guard.as_ref() {
        Some(conn) => f(conn),
        None => Err(EngineError::Closed),
      }
    })
    .await
    .map_err(|e| EngineError::Task(e.to_string()))?
  }
}

#[async_trait]
impl Engine for SqliteEngine {
  async fn get(&self, key: &str) -> Result<Option<Value>, EngineError> {
    let key = key.to_string();
    let data = self
      .with_conn(move |conn| {
        conn
          .query_row(
            "SELECT value FROM kv WHERE key = ?",
            params![key],
            |row| row.get::<_, Vec<u8>>(0),
          )
          .optional()
          .map_err(EngineError::from)
      })
      .await?;

    match data {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  async fn put(&self, key: &str, value: &Value) -> Result<(), EngineError> {
    let key = key.to_string();
    let data = serde_json::to_vec(value)?;
    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO kv (key, value, updated_at)
           VALUES (?, ?, datetime('now'))",
          params![key, data],
        )?;
        Ok(())
      })
      .await
  }

  async fn delete(&self, key: &str) -> Result<(), EngineError> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        let removed = conn.execute("DELETE FROM kv WHERE key = ?", params![key])?;
        if removed == 0 {
          debug!(%key, "delete of missing key");
        }
        Ok(())
      })
      .await
  }

  async fn contains(&self, key: &str) -> Result<bool, EngineError> {
    let key = key.to_string();
    self
      .with_conn(move |conn| {
        let exists: bool = conn.query_row(
          "SELECT EXISTS(SELECT 1 FROM kv WHERE key = ?)",
          params![key],
          |row| row.get(0),
        )?;
        Ok(exists)
      })
      .await
  }

  async fn keys(&self) -> Result<Vec<String>, EngineError> {
    self
      .with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await
  }

  async fn close(&self) -> Result<(), EngineError> {
    let conn = Arc::clone(&self.conn);
    let path = self.path.clone();
    tokio::task::spawn_blocking(move || -> Result<(), EngineError> {
      let mut guard = conn
        .lock()
        .map_err(|e| EngineError::Task(format!("lock poisoned: {}", e)))?;
      let Some(connection) = guard.take() else {
        return Ok(());
      };
      match connection.close() {
        Ok(()) => {
          info!(path = %path.display(), "closed persistent store");
          Ok(())
        }
        Err((connection, e)) => {
          // Keep the handle so a later close can retry
          *guard = Some(connection);
          Err(EngineError::Sqlite(e))
        }
      }
    })
    .await
    .map_err(|e| EngineError::Task(e.to_string()))?
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, EngineError> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| EngineError::Malformed(format!("bad timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn open_temp() -> (tempfile::TempDir, SqliteEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = SqliteEngine::open(&dir.path().join("nested").join("store.db")).unwrap();
    (dir, engine)
  }

  #[tokio::test]
  async fn test_put_get_roundtrip_preserves_structure() {
    let (_dir, engine) = open_temp();
    let value = json!({ "id": "peer-1", "ports": [4001, 4002], "seen": null });

    engine.put("peer-1", &value).await.unwrap();
    assert_eq!(engine.get("peer-1").await.unwrap(), Some(value));
  }

  #[tokio::test]
  async fn test_missing_key_is_none_not_error() {
    let (_dir, engine) = open_temp();
    assert_eq!(engine.get("nope").await.unwrap(), None);
    assert!(!engine.contains("nope").await.unwrap());
    engine.delete("nope").await.unwrap();
  }

  #[tokio::test]
  async fn test_keys_are_sorted_and_reflect_deletes() {
    let (_dir, engine) = open_temp();
    engine.put("b", &json!(2)).await.unwrap();
    engine.put("a", &json!(1)).await.unwrap();
    engine.put("c", &json!(3)).await.unwrap();
    engine.delete("b").await.unwrap();

    assert_eq!(engine.keys().await.unwrap(), vec!["a", "c"]);
  }

  #[tokio::test]
  async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    let engine = SqliteEngine::open(&path).unwrap();
    engine.put("k", &json!("v")).await.unwrap();
    engine.close().await.unwrap();

    let reopened = SqliteEngine::open(&path).unwrap();
    assert_eq!(reopened.get("k").await.unwrap(), Some(json!("v")));
  }

  #[tokio::test]
  async fn test_use_after_close_is_closed_error() {
    let (_dir, engine) = open_temp();
    engine.close().await.unwrap();
    engine.close().await.unwrap();

    assert!(matches!(engine.get("k").await, Err(EngineError::Closed)));
  }

  #[tokio::test]
  async fn test_updated_at_is_recorded() {
    let (_dir, engine) = open_temp();
    engine.put("k", &json!(1)).await.unwrap();

    let updated = engine.updated_at("k").await.unwrap().unwrap();
    assert!((Utc::now() - updated).num_seconds().abs() < 60);
    assert_eq!(engine.updated_at("missing").await.unwrap(), None);
  }
}
