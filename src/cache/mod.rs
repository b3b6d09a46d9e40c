//! Process-wide object cache with per-entry expiry
//!
//! This module provides the memoization layer used by the permission
//! evaluator (and any other expensive lookup a host application wants to
//! avoid repeating). Values are serialized to JSON on insert, so a single
//! cache instance can hold heterogeneous payloads under string keys.
//!
//! Expiry is enforced in two places:
//! - `get` checks the entry's deadline itself and evicts a stale entry on
//!   read (lazy eviction), so correctness never depends on the sweeper
//! - a background task sweeps expired entries on a fixed interval as a
//!   memory-hygiene measure
//!
//! The cache never raises recoverable errors: a miss is a normal outcome,
//! not a failure. The only real hazard is unbounded growth when callers
//! insert without sensible TTLs — that is a caller discipline issue, not
//! something the cache guards against.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Configuration for the object cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL applied by `set` when the caller doesn't pick one
    pub default_ttl: Duration,
    /// Interval for the background sweep task
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Cache statistics for monitoring and debugging
///
/// `size` counts entries without pruning expired ones first — it is a
/// diagnostic, not a correctness-bearing number. `estimated_bytes` is a
/// best-effort human-readable estimate (key lengths plus serialized value
/// lengths) and must never be used to drive eviction decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries, expired ones included
    pub size: usize,
    /// Human-readable size estimate, e.g. "1.4 KB"
    pub estimated_bytes: String,
    /// Total number of cache hits
    pub hits: u64,
    /// Total number of cache misses
    pub misses: u64,
    /// Number of entries evicted because their TTL ran out
    pub expired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    expired: u64,
}

/// Internal cache entry with expiry tracking
#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    #[allow(dead_code)]
    inserted_at: Instant,
    expires_at: Instant,
    /// Serialized length of the value, captured once at insert
    approx_bytes: usize,
}

impl CacheEntry {
    fn new(value: serde_json::Value, ttl: Duration) -> Self {
        let now = Instant::now();
        let approx_bytes = value.to_string().len();
        Self {
            value,
            inserted_at: now,
            // A zero TTL is clamped so expires_at stays strictly after
            // inserted_at.
            expires_at: now + ttl.max(Duration::from_millis(1)),
            approx_bytes,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    #[cfg(test)]
    fn lifetime(&self) -> Duration {
        self.expires_at - self.inserted_at
    }
}

/// Process-wide key→value store with per-entry expiry
///
/// Cloning is cheap and every clone shares the same storage; construct one
/// per process (or per test) and hand out clones or `Arc`s. The
/// constructor spawns the background sweep task, so it must run inside a
/// tokio runtime.
#[derive(Clone)]
pub struct ObjectCache {
    config: CacheConfig,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    counters: Arc<RwLock<Counters>>,
}

impl ObjectCache {
    /// Create a cache and start its background sweep task
    pub fn new(config: CacheConfig) -> Self {
        let cache = Self {
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(RwLock::new(Counters::default())),
        };

        let sweeper = cache.clone();
        tokio::spawn(async move {
            sweeper.sweep_task().await;
        });

        cache
    }

    /// Insert `value` under `key` with the configured default TTL
    ///
    /// Overwrites any existing entry for the same key unconditionally,
    /// resetting its expiry.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.config.default_ttl).await;
    }

    /// Insert `value` under `key` with an explicit TTL
    ///
    /// The value is serialized at insert time; once stored it belongs to
    /// the cache and later mutation of the caller's copy has no effect on
    /// what `get` returns. An empty key or an unserializable value is
    /// refused with a warning rather than an error.
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if key.is_empty() {
            warn!("refusing to cache under an empty key");
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "value not serializable, skipping cache insert");
                return;
            }
        };

        let entry = CacheEntry::new(value, ttl);
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Look up `key`, returning the stored value if it hasn't expired
    ///
    /// A stale entry found here is removed as a side effect, so readers
    /// never observe values past their TTL even if the sweeper hasn't run.
    /// A stored value that no longer deserializes as `T` is treated the
    /// same way — evicted and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.write().await;
        let mut counters = self.counters.write().await;

        let Some(entry) = entries.get(key) else {
            counters.misses += 1;
            return None;
        };

        if entry.is_expired() {
            entries.remove(key);
            counters.expired += 1;
            counters.misses += 1;
            return None;
        }

        let value = entry.value.clone();
        match serde_json::from_value(value) {
            Ok(value) => {
                counters.hits += 1;
                Some(value)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "cached value has unexpected shape, evicting");
                entries.remove(key);
                counters.misses += 1;
                None
            }
        }
    }

    /// Remove the entry for `key`; a no-op if the key is absent
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Empty the entire cache
    ///
    /// Meant for full resets such as test teardown, not steady-state
    /// request handling.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Snapshot cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let counters = self.counters.read().await;

        let bytes: usize = entries
            .iter()
            .map(|(key, entry)| key.len() + entry.approx_bytes)
            .sum();

        CacheStats {
            size: entries.len(),
            estimated_bytes: format_bytes(bytes),
            hits: counters.hits,
            misses: counters.misses,
            expired: counters.expired,
        }
    }

    async fn sweep_task(&self) {
        let mut interval = tokio::time::interval(self.config.sweep_interval);

        loop {
            interval.tick().await;
            self.sweep_expired().await;
        }
    }

    /// Remove every entry whose deadline has passed
    async fn sweep_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let swept = before - entries.len();

        if swept > 0 {
            let mut counters = self.counters.write().await;
            counters.expired += swept as u64;
            debug!(swept = swept, remaining = entries.len(), "cache sweep removed expired entries");
        }
    }
}

/// Render a byte count in a human-readable form
fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as usize)
    }
}
