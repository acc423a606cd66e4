//! Bounded, recency-ordered cache with a sliding freshness window.
//!
//! Entries live in a `HashMap`; recency is tracked by a `BTreeMap` keyed by a
//! monotonically increasing access tick, so the least-recently-used entry is
//! always the first key of the index. Touching or evicting an entry never
//! scans the whole cache.
//!
//! The cache never talks to the persistent engine. Callers pass `now` in so
//! freshness decisions are deterministic under test.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// A resident cache entry.
#[derive(Debug, Clone)]
struct Entry {
  value: Value,
  cached_at: Instant,
  /// Position in the recency index.
  tick: u64,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
  /// Present and fresh. The entry was promoted and its timestamp refreshed.
  Fresh(Value),
  /// Present but older than the freshness window. The entry was removed.
  Stale,
  /// Not resident.
  Missing,
}

/// Counters describing cache behaviour since the store was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub hits: u64,
  pub misses: u64,
  /// Lookups that found an entry past its freshness window.
  pub stale: u64,
  pub evictions: u64,
  pub entries: usize,
  pub capacity: usize,
}

/// LRU cache of JSON values with per-entry timestamps.
#[derive(Debug)]
pub struct RecencyCache {
  entries: HashMap<String, Entry>,
  /// Access tick -> key, oldest first.
  order: BTreeMap<u64, String>,
  next_tick: u64,
  capacity: usize,
  ttl: Duration,
  stats: CacheStats,
}

impl RecencyCache {
  pub fn new(capacity: usize, ttl: Duration) -> Self {
    Self {
      entries: HashMap::with_capacity(capacity.min(4096)),
      order: BTreeMap::new(),
      next_tick: 0,
      capacity,
      ttl,
      stats: CacheStats {
        capacity,
        ..CacheStats::default()
      },
    }
  }

  /// Insert or update `key`, making it the most recently used entry.
  ///
  /// Returns the key evicted to make room, if any. Only a *new* key can
  /// trigger an eviction; updating a resident key never does.
  pub fn admit(&mut self, key: &str, value: Value, now: Instant) -> Option<String> {
    if self.capacity == 0 {
      return None;
    }

    let tick = self.bump_tick();

    if let Some(entry) = self.entries.get_mut(key) {
      self.order.remove(&entry.tick);
      entry.value = value;
      entry.cached_at = now;
      entry.tick = tick;
      self.order.insert(tick, key.to_string());
      return None;
    }

    let evicted = if self.entries.len() >= self.capacity {
      self.evict_lru()
    } else {
      None
    };

    self.entries.insert(
      key.to_string(),
      Entry {
        value,
        cached_at: now,
        tick,
      },
    );
    self.order.insert(tick, key.to_string());
    self.stats.entries = self.entries.len();

    evicted
  }

  /// Look up `key`, applying the freshness window.
  ///
  /// A fresh hit is promoted to most recently used and its timestamp reset to
  /// `now`, so the window slides on every access. A stale entry is dropped.
  pub fn lookup(&mut self, key: &str, now: Instant) -> Lookup {
    let Some(entry) = self.entries.get(key) else {
      self.stats.misses += 1;
      return Lookup::Missing;
    };

    if now.saturating_duration_since(entry.cached_at) > self.ttl {
      self.remove(key);
      self.stats.stale += 1;
      self.stats.misses += 1;
      return Lookup::Stale;
    }

    let tick = self.bump_tick();
    let Some(entry) = self.entries.get_mut(key) else {
      return Lookup::Missing;
    };
    self.order.remove(&entry.tick);
    entry.tick = tick;
    entry.cached_at = now;
    self.order.insert(tick, key.to_string());
    self.stats.hits += 1;

    Lookup::Fresh(entry.value.clone())
  }

  /// Drop `key` from the cache. Returns whether it was resident.
  pub fn remove(&mut self, key: &str) -> bool {
    match self.entries.remove(key) {
      Some(entry) => {
        self.order.remove(&entry.tick);
        self.stats.entries = self.entries.len();
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.order.clear();
    self.stats.entries = 0;
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.entries.contains_key(key)
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  pub fn stats(&self) -> CacheStats {
    self.stats
  }

  /// Resident keys from least to most recently used.
  pub fn keys_by_recency(&self) -> Vec<String> {
    self.order.values().cloned().collect()
  }

  fn evict_lru(&mut self) -> Option<String> {
    let (_, key) = self.order.pop_first()?;
    self.entries.remove(&key);
    self.stats.evictions += 1;
    self.stats.entries = self.entries.len();
    Some(key)
  }

  fn bump_tick(&mut self) -> u64 {
    let tick = self.next_tick;
    self.next_tick += 1;
    tick
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  const TTL: Duration = Duration::from_millis(100);

  #[test]
  fn test_admit_evicts_least_recently_used() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(2, TTL);

    assert_eq!(cache.admit("k1", json!(1), now), None);
    assert_eq!(cache.admit("k2", json!(2), now), None);
    assert_eq!(cache.admit("k3", json!(3), now), Some("k1".to_string()));

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains("k1"));
    assert_eq!(cache.keys_by_recency(), vec!["k2", "k3"]);
  }

  #[test]
  fn test_updating_resident_key_does_not_evict() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(2, TTL);

    cache.admit("k1", json!(1), now);
    cache.admit("k2", json!(2), now);
    assert_eq!(cache.admit("k1", json!("one"), now), None);

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.keys_by_recency(), vec!["k2", "k1"]);
    assert_eq!(cache.lookup("k1", now), Lookup::Fresh(json!("one")));
  }

  #[test]
  fn test_lookup_promotes_entry() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(2, TTL);

    cache.admit("k1", json!(1), now);
    cache.admit("k2", json!(2), now);
    assert_eq!(cache.lookup("k1", now), Lookup::Fresh(json!(1)));

    // k2 is now the least recently used
    assert_eq!(cache.admit("k3", json!(3), now), Some("k2".to_string()));
    assert_eq!(cache.keys_by_recency(), vec!["k1", "k3"]);
  }

  #[test]
  fn test_stale_entry_is_removed() {
    let start = Instant::now();
    let mut cache = RecencyCache::new(4, TTL);

    cache.admit("k", json!("v"), start);
    assert_eq!(cache.lookup("k", start + Duration::from_millis(150)), Lookup::Stale);
    assert!(!cache.contains("k"));
    assert_eq!(cache.lookup("k", start + Duration::from_millis(150)), Lookup::Missing);
  }

  #[test]
  fn test_entry_at_exact_ttl_is_fresh() {
    let start = Instant::now();
    let mut cache = RecencyCache::new(4, TTL);

    cache.admit("k", json!("v"), start);
    assert_eq!(cache.lookup("k", start + TTL), Lookup::Fresh(json!("v")));
  }

  #[test]
  fn test_access_slides_freshness_window() {
    let start = Instant::now();
    let mut cache = RecencyCache::new(4, TTL);

    cache.admit("k", json!("v"), start);
    let t1 = start + Duration::from_millis(80);
    assert!(matches!(cache.lookup("k", t1), Lookup::Fresh(_)));
    // 160ms after admission but only 80ms after the last access
    let t2 = t1 + Duration::from_millis(80);
    assert!(matches!(cache.lookup("k", t2), Lookup::Fresh(_)));
  }

  #[test]
  fn test_zero_capacity_caches_nothing() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(0, TTL);

    assert_eq!(cache.admit("k", json!(1), now), None);
    assert!(cache.is_empty());
    assert_eq!(cache.lookup("k", now), Lookup::Missing);
  }

  #[test]
  fn test_remove_and_clear() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(3, TTL);

    cache.admit("a", json!(1), now);
    cache.admit("b", json!(2), now);
    assert!(cache.remove("a"));
    assert!(!cache.remove("a"));
    assert_eq!(cache.keys_by_recency(), vec!["b"]);

    cache.clear();
    assert!(cache.is_empty());
    assert!(cache.keys_by_recency().is_empty());
  }

  #[test]
  fn test_capacity_holds_over_long_sequences() {
    let now = Instant::now();
    let mut cache = RecencyCache::new(5, TTL);

    for i in 0..100 {
      cache.admit(&format!("k{}", i % 17), json!(i), now);
      cache.lookup(&format!("k{}", (i * 7) % 17), now);
      assert!(cache.len() <= cache.capacity());
    }
  }

  #[test]
  fn test_stats_track_hits_misses_and_evictions() {
    let start = Instant::now();
    let mut cache = RecencyCache::new(1, TTL);

    cache.admit("a", json!(1), start);
    cache.lookup("a", start);
    cache.lookup("missing", start);
    cache.admit("b", json!(2), start);
    cache.lookup("b", start + Duration::from_secs(1));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.capacity, 1);
  }
}
