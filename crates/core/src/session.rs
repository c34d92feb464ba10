//! Session controller: the single owner of mutable browsing state.
//!
//! The browse engine stays pure; everything it needs (active library,
//! query, filters) lives here and is passed in on each call.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::browse::{self, BrowseQuery, Facets, SortKey};
use crate::catalog::{
    build_http_client, validate_credential, CatalogCache, CatalogError, CredentialStatus,
    HealthMonitor, HttpMetadataClient, MetadataService,
};
use crate::config::{Config, ConfigError, ConnectionSettings};
use crate::ledger::{Ledger, ListName};
use crate::library::{Catalog, Item, ItemId, Library};
use crate::poster::{HttpPosterClient, PosterResolver, PosterService};
use crate::store::{KeyValueStore, SqliteStore, StorageBudget, StoreError, UsageReport};
use crate::theme::ThemePreference;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Default)]
struct ViewState {
    library_key: Option<String>,
    query: BrowseQuery,
}

/// One browsing session over a store and the two upstream services.
pub struct Session {
    settings: Arc<ConnectionSettings>,
    budget: Arc<StorageBudget>,
    metadata: Arc<dyn MetadataService>,
    catalog: CatalogCache,
    ledger: Ledger,
    posters: PosterResolver,
    theme: ThemePreference,
    view: RwLock<ViewState>,
}

impl Session {
    /// Open the configured SQLite store and connect to the configured services.
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let store = SqliteStore::new(&config.store.path, config.store.quota_bytes)?;
        Self::connect(config, Arc::new(store))
    }

    /// Connect to the configured services over HTTP, persisting to `store`.
    pub fn connect(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, SessionError> {
        let budget = Arc::new(StorageBudget::with_keep_most_recent(
            store,
            config.posters.keep_most_recent,
        ));
        let settings = Arc::new(ConnectionSettings::new(config, budget.clone())?);
        let client = build_http_client(Duration::from_secs(config.backend.timeout_secs as u64))?;

        let metadata = Arc::new(HttpMetadataClient::new(client.clone(), settings.clone()));
        let posters = Arc::new(HttpPosterClient::new(client, settings.clone()));
        Ok(Self::assemble(config, budget, settings, metadata, posters))
    }

    /// Build a session over arbitrary service implementations.
    pub fn with_services(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        metadata: Arc<dyn MetadataService>,
        posters: Arc<dyn PosterService>,
    ) -> Result<Self, SessionError> {
        let budget = Arc::new(StorageBudget::with_keep_most_recent(
            store,
            config.posters.keep_most_recent,
        ));
        let settings = Arc::new(ConnectionSettings::new(config, budget.clone())?);
        Ok(Self::assemble(config, budget, settings, metadata, posters))
    }

    fn assemble(
        config: &Config,
        budget: Arc<StorageBudget>,
        settings: Arc<ConnectionSettings>,
        metadata: Arc<dyn MetadataService>,
        posters: Arc<dyn PosterService>,
    ) -> Self {
        settings.load_credential();

        Self {
            catalog: CatalogCache::new(metadata.clone(), settings.clone(), budget.clone()),
            ledger: Ledger::load(budget.clone()),
            posters: PosterResolver::new(
                posters,
                budget.clone(),
                config.posters.placeholder_url.clone(),
            ),
            theme: ThemePreference::new(budget.clone()),
            view: RwLock::new(ViewState::default()),
            settings,
            budget,
            metadata,
        }
    }

    /// Load the catalog and select the default library.
    pub async fn start(&self) -> Result<Arc<Catalog>, CatalogError> {
        let result = self.catalog.load().await;
        self.select_default_library();
        result
    }

    fn select_default_library(&self) {
        let catalog = self.catalog.catalog();
        let key = browse::default_library(&catalog).map(|library| library.key.clone());
        self.view.write().unwrap().library_key = key;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn posters(&self) -> &PosterResolver {
        &self.posters
    }

    pub fn theme(&self) -> &ThemePreference {
        &self.theme
    }

    pub fn usage_report(&self) -> UsageReport {
        self.budget.usage_report()
    }

    /// Health monitor polling the metadata service.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(self.metadata.clone())
    }

    // =========================================================================
    // View state
    // =========================================================================

    /// Make the library with `key` active. Returns false if no such library exists.
    pub fn select_library(&self, key: &str) -> bool {
        let exists = self.catalog.catalog().iter().any(|library| library.key == key);
        if exists {
            self.view.write().unwrap().library_key = Some(key.to_string());
        }
        exists
    }

    /// The active library, if any.
    pub fn active_library(&self) -> Option<Library> {
        let key = self.view.read().unwrap().library_key.clone()?;
        self.catalog
            .catalog()
            .iter()
            .find(|library| library.key == key)
            .cloned()
    }

    pub fn query(&self) -> BrowseQuery {
        self.view.read().unwrap().query.clone()
    }

    pub fn set_browse_query(&self, query: BrowseQuery) {
        self.view.write().unwrap().query = query;
    }

    pub fn set_query(&self, query: &str) {
        self.view.write().unwrap().query.query = query.to_string();
    }

    pub fn set_genre(&self, genre: &str) {
        self.view.write().unwrap().query.genre = genre.to_string();
    }

    pub fn set_content_rating(&self, content_rating: &str) {
        self.view.write().unwrap().query.content_rating = content_rating.to_string();
    }

    pub fn set_sort(&self, sort: SortKey) {
        self.view.write().unwrap().query.sort = sort;
    }

    /// Active library's items after the current query, filters and sort.
    pub fn visible_items(&self) -> Vec<Item> {
        let Some(library) = self.active_library() else {
            return Vec::new();
        };
        let query = self.query();
        browse::browse(&library.items, &query)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Filter choices for the active library.
    pub fn facets(&self) -> Facets {
        self.active_library()
            .map(|library| browse::facets(&library.items))
            .unwrap_or_default()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub fn toggle(&self, list: ListName, id: ItemId) -> bool {
        self.ledger.toggle(list, id)
    }

    /// Test a candidate credential without storing it.
    pub async fn validate_credential(&self, candidate: &str) -> CredentialStatus {
        validate_credential(self.metadata.as_ref(), candidate).await
    }

    /// Store a credential (empty clears it) and reload the catalog with it.
    pub async fn set_credential(&self, value: &str) -> Result<Arc<Catalog>, CatalogError> {
        self.settings.set_credential(value);
        let result = self.catalog.refresh().await;
        self.select_default_library();
        result
    }

    /// Validate a candidate and, only if valid, store it and reload.
    pub async fn login(&self, candidate: &str) -> CredentialStatus {
        let status = self.validate_credential(candidate).await;
        if status == CredentialStatus::Valid {
            info!("Credential accepted");
            match self.set_credential(candidate).await {
                Ok(catalog) => info!("Reloaded {} libraries after login", catalog.len()),
                Err(e) => warn!("Reload after login failed: {}", e),
            }
        }
        status
    }

    /// Drop cached catalog, ledger and posters, then reload.
    pub async fn clear_cache(&self, clear_credential: bool) -> Result<Arc<Catalog>, CatalogError> {
        let result = self.catalog.invalidate(clear_credential).await;
        self.ledger.reload();
        self.select_default_library();
        result
    }
}
