//! Key-value storage for a peer node.
//!
//! This module provides a storage contract and its implementations:
//! - [`Storage`]: the capability set every store satisfies
//! - [`HybridStore`]: bounded LRU cache with a sliding TTL over a durable engine
//! - [`SqliteEngine`]: the durable engine, the system of record
//! - [`MemoryStore`]: ephemeral in-memory store with the same contract

mod engine;
mod error;
mod layer;
mod lru;
mod memory;
mod options;
mod traits;

pub use engine::{Engine, SqliteEngine};
pub use error::{EngineError, Result, StorageError};
pub use layer::HybridStore;
pub use lru::{CacheStats, Lookup, RecencyCache};
pub use memory::MemoryStore;
pub use options::{StoreOptions, WriteOrder, DEFAULT_CACHE_SIZE, DEFAULT_TTL};
pub use traits::{Storage, StorageExt};
