//! Mock key-value store for testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::store::{KeyValueStore, MemoryStore, StoreError};

/// A [`MemoryStore`] that records write attempts and rejects writes on demand.
///
/// The store is synchronous, so unlike the service mocks its controls are
/// plain methods.
#[derive(Debug, Default)]
pub struct MockStore {
    inner: MemoryStore,
    attempts: Mutex<Vec<(String, String)>>,
    max_value_len: Mutex<HashMap<String, usize>>,
    backend_error: Mutex<bool>,
    first_write_delay: Mutex<Option<Duration>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes to `key` whose value exceeds `max_len` bytes with a quota error.
    pub fn reject_values_longer_than(&self, key: &str, max_len: usize) {
        self.max_value_len
            .lock()
            .unwrap()
            .insert(key.to_string(), max_len);
    }

    /// Fail every write with a backend error.
    pub fn fail_writes_with_backend_error(&self, fail: bool) {
        *self.backend_error.lock().unwrap() = fail;
    }

    /// Every value written to `key`, accepted or not, in order.
    pub fn attempts_for(&self, key: &str) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Block the calling thread for `delay` on the next write only.
    pub fn delay_next_write(&self, delay: Duration) {
        *self.first_write_delay.lock().unwrap() = Some(delay);
    }
}

impl KeyValueStore for MockStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let delay = self.first_write_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.attempts
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));

        if *self.backend_error.lock().unwrap() {
            return Err(StoreError::Backend("simulated backend failure".to_string()));
        }

        if let Some(max_len) = self.max_value_len.lock().unwrap().get(key) {
            if value.len() > *max_len {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed: crate::store::entry_size(key, value),
                    quota: (key.len() + *max_len) as u64,
                });
            }
        }

        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }

    fn entries(&self) -> Result<Vec<(String, String)>, StoreError> {
        self.inner.entries()
    }
}
