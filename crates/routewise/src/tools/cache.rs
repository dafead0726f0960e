//! TTL cache for tool results.
//!
//! Entries are keyed by `"{tool}:{input}"` and expire after a fixed TTL
//! (five minutes by default). An expired entry is treated as absent and is
//! dropped on lookup. The cache is shared by every in-flight request; the
//! lock is only held for the map operation itself, never across a tool call,
//! so concurrent writers for the same key simply race and the last one wins.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Default time-to-live for a cached result.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: String,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Snapshot of cache diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Shared tool-result cache with a TTL and an optional capacity bound.
#[derive(Debug)]
pub struct ToolResultCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    /// Maximum number of entries before eviction. `None` means unbounded.
    max_entries: Option<usize>,
}

impl ToolResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_entries: None,
        }
    }

    /// Bound the cache. When full, the oldest entry is evicted on insert.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for a tool call.
    pub fn key(tool_name: &str, input: &str) -> String {
        format!("{tool_name}:{input}")
    }

    /// Look up a fresh result. Expired entries are removed and count as a miss.
    pub fn get(&self, tool_name: &str, input: &str) -> Option<String> {
        let key = Self::key(tool_name, input);
        let mut state = self.lock();
        let fresh = match state.entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                state.entries.remove(&key);
                None
            }
            None => None,
        };
        if fresh.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        fresh
    }

    /// Store a result, replacing any previous entry for the same key.
    pub fn put(&self, tool_name: &str, input: &str, result: String) {
        let key = Self::key(tool_name, input);
        let mut state = self.lock();
        if let Some(max) = self.max_entries
            && !state.entries.contains_key(&key)
            && state.entries.len() >= max
        {
            evict_oldest(&mut state.entries);
        }
        state.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
        before - state.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ToolResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

fn evict_oldest(entries: &mut HashMap<String, CacheEntry>) {
    if let Some(oldest_key) = entries
        .iter()
        .min_by_key(|(_, v)| v.inserted_at)
        .map(|(k, _)| k.clone())
    {
        entries.remove(&oldest_key);
    }
}
