//! Catalog cache - the session's library list, served from the store when
//! possible and fetched from the metadata service otherwise.
//!
//! A fetched catalog is always used in full for the session. What gets
//! persisted is the richest [`Fidelity`] that fits in the store.

mod client;
mod status;

pub use client::{build_http_client, HttpMetadataClient};
pub use status::{
    validate_credential, CredentialStatus, HealthMonitor, HealthStatus, ServiceHealth,
    UpstreamHealth, HEALTH_POLL_INTERVAL,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ConnectionSettings;
use crate::error::ErrorKind;
use crate::library::{CacheEnvelope, Catalog, Fidelity, Library, CASCADE};
use crate::metrics;
use crate::store::{
    StorageBudget, CATALOG_KEY, FAVORITES_KEY, POSTER_KEY_PREFIX, WATCH_LATER_KEY,
};

/// Errors that fail a catalog load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The service could not be reached, or its health check failed.
    #[error("Metadata service unreachable: {0}")]
    NetworkUnreachable(String),

    /// The libraries request returned a non-success status.
    #[error("Metadata service returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    /// The response body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            CatalogError::UpstreamStatus { .. } | CatalogError::Parse(_) => {
                ErrorKind::UpstreamStatusError
            }
        }
    }
}

/// Trait for the library metadata service.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Unauthenticated liveness probe.
    async fn health(&self) -> Result<HealthStatus, CatalogError>;

    /// Fetch every library, sending `credential` when present.
    async fn libraries(&self, credential: Option<&str>) -> Result<Catalog, CatalogError>;
}

/// Lifecycle of the session catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Empty,
    Loading,
    Ready,
    Error(CatalogError),
}

/// Where the active catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    Cache(Fidelity),
    Network,
}

struct CacheInner {
    state: LoadState,
    catalog: Arc<Catalog>,
    source: Option<CatalogSource>,
    /// Fidelity persisted by the last network load; `None` means memory only.
    persisted: Option<Fidelity>,
    saved_at: Option<DateTime<Utc>>,
}

impl CacheInner {
    fn empty() -> Self {
        Self {
            state: LoadState::Empty,
            catalog: Arc::new(Vec::new()),
            source: None,
            persisted: None,
            saved_at: None,
        }
    }
}

/// Owns the in-memory and persisted catalog.
pub struct CatalogCache {
    service: Arc<dyn MetadataService>,
    settings: Arc<ConnectionSettings>,
    budget: Arc<StorageBudget>,
    inner: RwLock<CacheInner>,
    generation: AtomicU64,
}

impl CatalogCache {
    pub fn new(
        service: Arc<dyn MetadataService>,
        settings: Arc<ConnectionSettings>,
        budget: Arc<StorageBudget>,
    ) -> Self {
        Self {
            service,
            settings,
            budget,
            inner: RwLock::new(CacheInner::empty()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> LoadState {
        self.inner.read().unwrap().state.clone()
    }

    /// The active catalog (empty unless `Ready`).
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.inner.read().unwrap().catalog)
    }

    pub fn source(&self) -> Option<CatalogSource> {
        self.inner.read().unwrap().source
    }

    /// Fidelity persisted by the last network load, `None` if memory only.
    pub fn persisted_fidelity(&self) -> Option<Fidelity> {
        self.inner.read().unwrap().persisted
    }

    /// When the active catalog was written to the store.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().unwrap().saved_at
    }

    /// Load the catalog from the store, or from the network on a cache miss.
    ///
    /// Every call takes a new generation. A call that completes after a
    /// newer one started does not overwrite the newer result.
    pub async fn load(&self) -> Result<Arc<Catalog>, CatalogError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.write().unwrap().state = LoadState::Loading;

        if let Some(catalog) = self.load_from_store(generation) {
            return Ok(catalog);
        }

        match self.fetch().await {
            Ok(catalog) => {
                if !self.is_current(generation) {
                    debug!("Discarding stale catalog fetch (generation {})", generation);
                    return Ok(self.catalog());
                }

                let persisted = self.persist(&catalog);
                let catalog = Arc::new(catalog);
                let mut inner = self.inner.write().unwrap();
                inner.state = LoadState::Ready;
                inner.catalog = Arc::clone(&catalog);
                inner.source = Some(CatalogSource::Network);
                inner.persisted = persisted;
                inner.saved_at = persisted.map(|_| Utc::now());
                metrics::CATALOG_LOADS.with_label_values(&["network"]).inc();
                info!("Catalog loaded from network: {} libraries", catalog.len());
                Ok(catalog)
            }
            Err(e) => {
                metrics::CATALOG_LOADS.with_label_values(&["error"]).inc();
                warn!(kind = %e.kind(), "Catalog load failed: {}", e);
                if self.is_current(generation) {
                    let mut inner = self.inner.write().unwrap();
                    inner.state = LoadState::Error(e.clone());
                    inner.catalog = Arc::new(Vec::new());
                    inner.source = None;
                }
                Err(e)
            }
        }
    }

    /// Drop the persisted catalog and load again from the network.
    ///
    /// Used when the credential changes; the ledger and posters are kept.
    pub async fn refresh(&self) -> Result<Arc<Catalog>, CatalogError> {
        self.budget.remove(CATALOG_KEY);
        self.reset();
        self.load().await
    }

    /// Remove the persisted catalog, ledger and poster entries, then reload.
    ///
    /// The credential is kept unless `clear_credential` is set.
    pub async fn invalidate(&self, clear_credential: bool) -> Result<Arc<Catalog>, CatalogError> {
        self.budget.remove(CATALOG_KEY);
        self.budget.remove(FAVORITES_KEY);
        self.budget.remove(WATCH_LATER_KEY);
        let posters = self.budget.remove_prefixed(POSTER_KEY_PREFIX);
        if clear_credential {
            self.settings.set_credential("");
        }
        info!("Cache invalidated ({} poster entries removed)", posters);

        self.reset();
        self.load().await
    }

    fn reset(&self) {
        *self.inner.write().unwrap() = CacheInner::empty();
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn load_from_store(&self, generation: u64) -> Option<Arc<Catalog>> {
        let raw = self.budget.read(CATALOG_KEY)?;

        match CacheEnvelope::parse(&raw) {
            Ok(envelope) => {
                let catalog = Arc::new(envelope.libraries);
                if self.is_current(generation) {
                    let mut inner = self.inner.write().unwrap();
                    inner.state = LoadState::Ready;
                    inner.catalog = Arc::clone(&catalog);
                    inner.source = Some(CatalogSource::Cache(envelope.fidelity));
                    inner.saved_at = envelope.saved_at;
                }
                metrics::CATALOG_LOADS.with_label_values(&["cache"]).inc();
                info!(
                    "Catalog loaded from cache ({} fidelity, {} libraries)",
                    envelope.fidelity,
                    catalog.len()
                );
                Some(catalog)
            }
            Err(e) => {
                warn!(kind = %ErrorKind::CorruptCache, "Discarding unreadable catalog cache: {}", e);
                self.budget.remove(CATALOG_KEY);
                None
            }
        }
    }

    async fn fetch(&self) -> Result<Catalog, CatalogError> {
        self.service.health().await?;

        let credential = self.settings.credential();
        self.service.libraries(credential.as_deref()).await
    }

    /// Persist the richest fidelity that fits. `None` means memory only.
    fn persist(&self, catalog: &[Library]) -> Option<Fidelity> {
        for (fidelity, _) in CASCADE {
            let json = match serde_json::to_string(&CacheEnvelope::new(*fidelity, catalog)) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize {} catalog: {}", fidelity, e);
                    continue;
                }
            };

            if self.budget.write(CATALOG_KEY, &json).is_persisted() {
                metrics::CATALOG_PERSISTS
                    .with_label_values(&[fidelity.as_str()])
                    .inc();
                info!("Catalog cached at {} fidelity ({} bytes)", fidelity, json.len());
                return Some(*fidelity);
            }
            debug!("Catalog did not fit at {} fidelity", fidelity);
        }

        // Nothing fit; the session keeps the catalog in memory only.
        self.budget.remove(CATALOG_KEY);
        metrics::CATALOG_PERSISTS
            .with_label_values(&["memory_only"])
            .inc();
        warn!("Catalog too large to cache at any fidelity; continuing in memory only");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::testing::{fixtures, MockMetadataService, MockStore};

    struct Harness {
        cache: CatalogCache,
        service: Arc<MockMetadataService>,
        settings: Arc<ConnectionSettings>,
    }

    fn harness(store: Arc<dyn KeyValueStore>) -> Harness {
        let budget = Arc::new(StorageBudget::new(store));
        let settings = Arc::new(ConnectionSettings::new(&Config::default(), budget.clone()).unwrap());
        let service = Arc::new(MockMetadataService::new());
        let cache = CatalogCache::new(service.clone(), settings.clone(), budget);
        Harness {
            cache,
            service,
            settings,
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_empty() {
        let h = harness(Arc::new(MemoryStore::new()));
        assert_eq!(h.cache.state(), LoadState::Empty);
        assert!(h.cache.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_network_load_persists_full_and_serves_cache_next() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(store.clone());
        h.service.set_catalog(fixtures::scenario_catalog()).await;

        let catalog = h.cache.load().await.unwrap();
        assert_eq!(catalog[0].name, "Movies");
        assert_eq!(h.cache.state(), LoadState::Ready);
        assert_eq!(h.cache.source(), Some(CatalogSource::Network));
        assert_eq!(h.cache.persisted_fidelity(), Some(Fidelity::Full));
        assert_eq!(h.service.libraries_calls().await, 1);

        let persisted = CacheEnvelope::parse(&store.get(CATALOG_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.fidelity, Fidelity::Full);

        // A second session on the same store never touches the network.
        let second = harness(store.clone());
        let cached = second.cache.load().await.unwrap();
        assert_eq!(cached.as_ref(), catalog.as_ref());
        assert_eq!(second.cache.source(), Some(CatalogSource::Cache(Fidelity::Full)));
        assert_eq!(second.service.health_calls().await, 0);
        assert_eq!(second.service.libraries_calls().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_discarded_and_fetched() {
        let store = Arc::new(MemoryStore::new());
        store.set(CATALOG_KEY, "{definitely not json").unwrap();
        let h = harness(store.clone());
        h.service.set_catalog(fixtures::scenario_catalog()).await;

        let catalog = h.cache.load().await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(h.cache.source(), Some(CatalogSource::Network));
        let raw = store.get(CATALOG_KEY).unwrap().unwrap();
        assert!(CacheEnvelope::parse(&raw).is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_cache_key_absent_when_fetch_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set(CATALOG_KEY, "[{").unwrap();
        let h = harness(store.clone());
        h.service.set_unreachable(true).await;

        assert!(h.cache.load().await.is_err());
        assert!(store.get(CATALOG_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_health_skips_main_request() {
        let h = harness(Arc::new(MemoryStore::new()));
        h.service.set_unreachable(true).await;

        let err = h.cache.load().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
        assert_eq!(h.service.libraries_calls().await, 0);
        assert!(matches!(h.cache.state(), LoadState::Error(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error_with_code() {
        let h = harness(Arc::new(MemoryStore::new()));
        h.service.set_libraries_status(Some(503)).await;

        let err = h.cache.load().await.unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(err.kind(), ErrorKind::UpstreamStatusError);
        assert_eq!(h.cache.state(), LoadState::Error(err));
    }

    #[tokio::test]
    async fn test_credential_is_sent_with_libraries_request() {
        let h = harness(Arc::new(MemoryStore::new()));
        h.settings.set_credential("hunter2");
        h.cache.load().await.unwrap();
        assert_eq!(h.service.last_credential().await.as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_fidelity_falls_back_in_order() {
        let store = Arc::new(MockStore::new());
        let h = harness(store.clone());
        h.service.set_catalog(fixtures::heavy_catalog(20)).await;
        let envelope_len = |fidelity| {
            serde_json::to_string(&CacheEnvelope::new(fidelity, &fixtures::heavy_catalog(20)))
                .unwrap()
                .len()
        };
        // Room for timestamp jitter at lightweight, far short of full.
        let max_len = envelope_len(Fidelity::Lightweight) + 64;
        assert!(envelope_len(Fidelity::Full) > max_len + 64);
        store.reject_values_longer_than(CATALOG_KEY, max_len);

        let catalog = h.cache.load().await.unwrap();

        let attempted: Vec<Fidelity> = store
            .attempts_for(CATALOG_KEY)
            .iter()
            .map(|v| CacheEnvelope::parse(v).unwrap().fidelity)
            .fold(Vec::new(), |mut acc, f| {
                if acc.last() != Some(&f) {
                    acc.push(f);
                }
                acc
            });
        assert_eq!(attempted, vec![Fidelity::Full, Fidelity::Lightweight]);
        assert_eq!(h.cache.persisted_fidelity(), Some(Fidelity::Lightweight));
        // The session still renders the full response.
        assert_eq!(catalog.as_ref(), &fixtures::heavy_catalog(20));
    }

    #[tokio::test]
    async fn test_memory_only_when_nothing_fits() {
        let store = Arc::new(MemoryStore::with_quota(32));
        let h = harness(store.clone());
        h.service.set_catalog(fixtures::scenario_catalog()).await;

        let catalog = h.cache.load().await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(h.cache.state(), LoadState::Ready);
        assert_eq!(h.cache.persisted_fidelity(), None);
        assert!(store.get(CATALOG_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_ready() {
        let h = harness(Arc::new(MemoryStore::new()));
        h.service.set_catalog(Vec::new()).await;
        let catalog = h.cache.load().await.unwrap();
        assert!(catalog.is_empty());
        assert_eq!(h.cache.state(), LoadState::Ready);
    }

    #[tokio::test]
    async fn test_invalidate_clears_everything_but_credential() {
        let store = Arc::new(MemoryStore::new());
        let h = harness(store.clone());
        h.settings.set_credential("hunter2");
        h.cache.load().await.unwrap();
        store.set(FAVORITES_KEY, "[1]").unwrap();
        store.set(WATCH_LATER_KEY, "[2]").unwrap();
        store.set("poster_A_2000", "https://img/a.jpg").unwrap();
        store.set("theme", "light").unwrap();

        h.cache.invalidate(false).await.unwrap();

        assert!(store.get(FAVORITES_KEY).unwrap().is_none());
        assert!(store.get(WATCH_LATER_KEY).unwrap().is_none());
        assert!(store.get("poster_A_2000").unwrap().is_none());
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(h.settings.credential().as_deref(), Some("hunter2"));
        // Reloaded from the network and re-persisted.
        assert_eq!(h.service.libraries_calls().await, 2);
        assert!(store.get(CATALOG_KEY).unwrap().is_some());

        h.cache.invalidate(true).await.unwrap();
        assert!(h.settings.credential().is_none());
    }

    #[tokio::test]
    async fn test_stale_load_does_not_overwrite_newer() {
        let h = harness(Arc::new(MemoryStore::new()));
        h.service.set_catalog(fixtures::scenario_catalog()).await;
        h.service
            .set_libraries_delay(std::time::Duration::from_millis(50))
            .await;

        let slow = h.cache.load();
        let fast = async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            h.service.set_libraries_status(Some(500)).await;
            h.service
                .set_libraries_delay(std::time::Duration::from_millis(0))
                .await;
            h.cache.load().await
        };
        let (slow_result, fast_result) = tokio::join!(slow, fast);

        assert!(fast_result.is_err());
        // The older call finished last but must not replace the newer error state.
        assert!(slow_result.unwrap().is_empty());
        assert!(matches!(h.cache.state(), LoadState::Error(_)));
    }
}
