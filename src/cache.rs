// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort TTL caches.
//!
//! Token results, spreadsheet snapshots and rate-limit windows all live
//! behind the [`TtlCache`] trait so handlers never touch a global map. The
//! in-process [`InMemoryTtlCache`] is an LRU with per-entry expiry; a shared
//! external cache can be slotted in by implementing the same trait.
//!
//! Entries are never returned past their expiry. Expired entries are removed
//! lazily on read and in bulk by [`TtlCache::sweep`], which the in-memory
//! cache also runs on its own every [`SWEEP_EVERY`] insertions.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// Insertions between opportunistic sweeps.
pub const SWEEP_EVERY: u64 = 64;

/// Key/value cache where every entry carries its own time-to-live.
pub trait TtlCache<V>: Send + Sync {
    /// Get a live entry. Returns `None` if absent or expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key` for `ttl`. A zero TTL stores nothing.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Remove a single entry.
    fn remove(&self, key: &str);

    /// Drop every expired entry and return how many were removed.
    fn sweep(&self) -> usize;
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-process LRU cache with per-entry expiry.
pub struct InMemoryTtlCache<V> {
    cache: Mutex<LruCache<String, CacheEntry<V>>>,
    inserts: AtomicU64,
}

impl<V> InMemoryTtlCache<V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            inserts: AtomicU64::new(0),
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> TtlCache<V> for InMemoryTtlCache<V>
where
    V: Clone + Send,
{
    fn get(&self, key: &str) -> Option<V> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if Instant::now() < entry.expires_at {
                return Some(entry.value.clone());
            }
            cache.pop(key);
        }
        None
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key.to_string(),
                CacheEntry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        if self.inserts.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let removed = self.sweep();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(key);
        }
    }

    fn sweep(&self) -> usize {
        let Ok(mut cache) = self.cache.lock() else {
            return 0;
        };
        let now = Instant::now();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        expired.len()
    }
}
