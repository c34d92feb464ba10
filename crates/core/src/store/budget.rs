//! Storage budget manager.
//!
//! Every persistent write goes through [`StorageBudget::write`]. Quota
//! exhaustion is absorbed here: poster entries are evicted and the write
//! retried once; if that also fails the value is kept for this session only.
//! Nothing in this module returns an error to its caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError, CATALOG_KEY, POSTER_KEY_PREFIX};
use crate::metrics;

/// Poster entries kept by a quota-triggered eviction.
pub const DEFAULT_KEEP_MOST_RECENT: usize = 50;

/// Where a written value ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Stored in the persistent store.
    Persisted,
    /// Held in memory for this session; lost on restart.
    SessionOnly,
}

impl WriteOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted)
    }
}

/// Persisted bytes by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub poster_cache: u64,
    pub catalog_cache: u64,
    pub other: u64,
}

impl UsageReport {
    pub fn total(&self) -> u64 {
        self.poster_cache + self.catalog_cache + self.other
    }
}

/// Mediates all writes to the persistent store.
pub struct StorageBudget {
    store: Arc<dyn KeyValueStore>,
    session_only: Mutex<HashMap<String, String>>,
    keep_most_recent: usize,
}

impl StorageBudget {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_keep_most_recent(store, DEFAULT_KEEP_MOST_RECENT)
    }

    /// Create a budget whose quota-triggered eviction keeps `keep_most_recent` posters.
    pub fn with_keep_most_recent(store: Arc<dyn KeyValueStore>, keep_most_recent: usize) -> Self {
        Self {
            store,
            session_only: Mutex::new(HashMap::new()),
            keep_most_recent,
        }
    }

    /// Read a value, preferring a session-only copy over the persisted one.
    pub fn read(&self, key: &str) -> Option<String> {
        if let Some(value) = self.session_only.lock().unwrap().get(key) {
            return Some(value.clone());
        }

        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}' from store: {}", key, e);
                None
            }
        }
    }

    /// Persist a value, degrading to session-only storage on failure.
    pub fn write(&self, key: &str, value: &str) -> WriteOutcome {
        let first = match self.store.set(key, value) {
            Ok(()) => return self.persisted(key),
            Err(e) => e,
        };

        if let StoreError::QuotaExceeded { .. } = first {
            metrics::STORE_QUOTA_FAILURES.inc();
            warn!("{}; evicting poster cache and retrying", first);
            self.evict_poster_entries(self.keep_most_recent);

            match self.store.set(key, value) {
                Ok(()) => return self.persisted(key),
                Err(e) => {
                    if let StoreError::QuotaExceeded { .. } = e {
                        metrics::STORE_QUOTA_FAILURES.inc();
                    }
                    warn!("Retry failed, keeping '{}' for this session only: {}", key, e);
                }
            }
        } else {
            warn!("Keeping '{}' for this session only: {}", key, first);
        }

        self.session_only
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        WriteOutcome::SessionOnly
    }

    fn persisted(&self, key: &str) -> WriteOutcome {
        self.session_only.lock().unwrap().remove(key);
        WriteOutcome::Persisted
    }

    /// Remove a key from both the session overlay and the store.
    pub fn remove(&self, key: &str) {
        self.session_only.lock().unwrap().remove(key);
        if let Err(e) = self.store.remove(key) {
            warn!("Failed to remove '{}' from store: {}", key, e);
        }
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn remove_prefixed(&self, prefix: &str) -> usize {
        self.session_only
            .lock()
            .unwrap()
            .retain(|k, _| !k.starts_with(prefix));

        let keys = self.keys_with_prefix(prefix);
        for key in &keys {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to remove '{}' from store: {}", key, e);
            }
        }
        keys.len()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(prefix)).collect(),
            Err(e) => {
                warn!("Failed to enumerate store keys: {}", e);
                Vec::new()
            }
        }
    }

    /// Drop the oldest poster entries so at most `keep_most_recent` remain.
    ///
    /// "Oldest" is the store's enumeration order, i.e. first insertion.
    /// No access time is tracked, so this approximates LRU rather than
    /// implementing it: a poster read every session is evicted as readily
    /// as one never read again. Returns how many entries were removed.
    pub fn evict_poster_entries(&self, keep_most_recent: usize) -> usize {
        let keys = self.keys_with_prefix(POSTER_KEY_PREFIX);
        if keys.len() <= keep_most_recent {
            return 0;
        }

        let excess = keys.len() - keep_most_recent;
        let mut removed = 0;
        for key in keys.iter().take(excess) {
            match self.store.remove(key) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to evict '{}': {}", key, e),
            }
        }

        metrics::POSTER_EVICTIONS.inc_by(removed as u64);
        debug!("Evicted {} poster entries, kept {}", removed, keep_most_recent);
        removed
    }

    /// Persisted bytes partitioned into poster cache, catalog cache and other.
    pub fn usage_report(&self) -> UsageReport {
        let entries = match self.store.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to enumerate store entries: {}", e);
                return UsageReport::default();
            }
        };

        let mut report = UsageReport::default();
        for (key, value) in &entries {
            let size = super::entry_size(key, value);
            if key.starts_with(POSTER_KEY_PREFIX) {
                report.poster_cache += size;
            } else if key == CATALOG_KEY {
                report.catalog_cache += size;
            } else {
                report.other += size;
            }
        }
        report
    }
}
