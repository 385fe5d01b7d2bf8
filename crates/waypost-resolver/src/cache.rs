//! Bounded TTL cache for resolution results.
//!
//! Keyed by the canonical moniker string. Entries expire after the
//! configured TTL; on overflow the least-recently-used entry is
//! evicted. A successful reload purges everything; status updates
//! purge only the affected entries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::service::ResolveResult;

/// Cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether resolution results are cached at all.
    pub enabled: bool,
    /// Maximum number of entries.
    pub max_size: usize,
    /// Time entries stay valid.
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 10_000,
            default_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: ResolveResult,
    inserted_at: Instant,
    last_used: Instant,
}

/// Concurrent TTL+LRU cache of [`ResolveResult`]s.
#[derive(Debug)]
pub struct ResolveCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    config: CacheConfig,
}

impl ResolveCache {
    /// Creates a cache with the given tuning.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Looks up a fresh entry, refreshing its recency.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ResolveResult> {
        if !self.config.enabled {
            return None;
        }
        let mut entries = self.lock();
        let entry = entries.get_mut(key)?;
        if entry.inserted_at.elapsed() > self.config.default_ttl {
            entries.remove(key);
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.value.clone())
    }

    /// Stores a result, evicting the least-recently-used entry when the
    /// cache is full.
    pub fn insert(&self, key: String, value: ResolveResult) {
        if !self.config.enabled || self.config.max_size == 0 {
            return;
        }
        let mut entries = self.lock();
        if entries.len() >= self.config.max_size && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                last_used: now,
            },
        );
    }

    /// Removes every entry. Called after a successful reload.
    pub fn purge_all(&self) {
        self.lock().clear();
    }

    /// Removes entries whose resolved node sits at or under `path`, or
    /// whose binding was donated by `path`.
    pub fn purge_path(&self, path: &str) {
        let slash_prefix = format!("{path}/");
        let dot_prefix = format!("{path}.");
        self.lock().retain(|_, entry| {
            let v = &entry.value;
            !(v.path == path
                || v.binding_path == path
                || v.path.starts_with(&slash_prefix)
                || v.path.starts_with(&dot_prefix))
        });
    }

    /// Current number of entries (including any not yet expired-swept).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
