pub mod browse;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod library;
pub mod metrics;
pub mod poster;
pub mod session;
pub mod store;
pub mod testing;
pub mod theme;

pub use browse::{browse, default_library, facets, BrowseQuery, Facets, SortKey};
pub use catalog::{
    CatalogCache, CatalogError, CatalogSource, CredentialStatus, HealthMonitor, HealthStatus,
    HttpMetadataClient, LoadState, MetadataService, ServiceHealth,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConnectionSettings,
    SanitizedConfig,
};
pub use error::ErrorKind;
pub use ledger::{Ledger, ListName};
pub use library::{CacheEnvelope, Catalog, Fidelity, Item, ItemId, Library, Metadata};
pub use poster::{HttpPosterClient, PosterError, PosterResolver, PosterService};
pub use session::{Session, SessionError};
pub use store::{
    KeyValueStore, MemoryStore, SqliteStore, StorageBudget, StoreError, UsageReport, WriteOutcome,
};
pub use theme::{Theme, ThemePreference};
