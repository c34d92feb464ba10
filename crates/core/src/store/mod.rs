//! Persistent key-value storage with a byte quota.
//!
//! Mirrors a browser's per-origin store: string keys, string values, a
//! fixed byte budget and enumeration in insertion order.

mod budget;
mod memory;
mod sqlite;

pub use budget::{StorageBudget, UsageReport, WriteOutcome, DEFAULT_KEEP_MOST_RECENT};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use crate::error::ErrorKind;

/// Persisted key of the catalog cache envelope.
pub const CATALOG_KEY: &str = "librariesData";
/// Persisted key of the credential.
pub const CREDENTIAL_KEY: &str = "serverPassword";
/// Persisted key of the theme preference.
pub const THEME_KEY: &str = "theme";
/// Persisted key of the favorites list.
pub const FAVORITES_KEY: &str = "favorites";
/// Persisted key of the watch-later list.
pub const WATCH_LATER_KEY: &str = "watchLater";
/// Prefix of every poster cache entry.
pub const POSTER_KEY_PREFIX: &str = "poster_";

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the store's byte quota.
    #[error("Quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded { key: String, needed: u64, quota: u64 },

    /// The backend itself failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StoreError::QuotaExceeded { .. } => Some(ErrorKind::QuotaExceeded),
            StoreError::Backend(_) => None,
        }
    }
}

/// Size of a stored entry: UTF-8 length of key plus value.
pub fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

/// Trait for the underlying persistent store.
///
/// Implementations are synchronous; reads and writes never suspend.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value. Overwriting keeps the key's enumeration position.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys in insertion order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// All entries in insertion order.
    fn entries(&self) -> Result<Vec<(String, String)>, StoreError>;
}
