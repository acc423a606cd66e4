//! Storage layer for peer nodes: a bounded, time-limited in-memory cache
//! backed by a durable SQLite key-value store.

pub mod config;
pub mod logging;
pub mod store;

pub use store::{HybridStore, MemoryStore, Storage, StorageError, StorageExt, StoreOptions};
