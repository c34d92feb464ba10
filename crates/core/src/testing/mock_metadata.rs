//! Mock metadata service for testing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::{CatalogError, HealthStatus, MetadataService, UpstreamHealth};
use crate::library::Catalog;

/// Mock implementation of the MetadataService trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable catalog
/// - Simulate an unreachable service, a non-success status or a bad body
/// - Delay responses to interleave overlapping loads
/// - Count calls and record the credential sent
#[derive(Debug, Clone)]
pub struct MockMetadataService {
    catalog: Arc<RwLock<Catalog>>,
    unreachable: Arc<RwLock<bool>>,
    libraries_status: Arc<RwLock<Option<u16>>>,
    libraries_malformed: Arc<RwLock<bool>>,
    libraries_delay: Arc<RwLock<Duration>>,
    health_calls: Arc<RwLock<usize>>,
    libraries_calls: Arc<RwLock<usize>>,
    last_credential: Arc<RwLock<Option<String>>>,
}

impl Default for MockMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataService {
    /// Create a healthy service with an empty catalog.
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Vec::new())),
            unreachable: Arc::new(RwLock::new(false)),
            libraries_status: Arc::new(RwLock::new(None)),
            libraries_malformed: Arc::new(RwLock::new(false)),
            libraries_delay: Arc::new(RwLock::new(Duration::ZERO)),
            health_calls: Arc::new(RwLock::new(0)),
            libraries_calls: Arc::new(RwLock::new(0)),
            last_credential: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub async fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = catalog;
    }

    /// Make every call fail as if the network were down.
    pub async fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write().await = unreachable;
    }

    /// Make the libraries request answer with this non-success status.
    pub async fn set_libraries_status(&self, status: Option<u16>) {
        *self.libraries_status.write().await = status;
    }

    /// Answer libraries requests with a 2xx body that does not parse.
    pub async fn set_libraries_malformed(&self, malformed: bool) {
        *self.libraries_malformed.write().await = malformed;
    }

    /// Delay libraries responses. The response is decided before the delay.
    pub async fn set_libraries_delay(&self, delay: Duration) {
        *self.libraries_delay.write().await = delay;
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    pub async fn health_calls(&self) -> usize {
        *self.health_calls.read().await
    }

    pub async fn libraries_calls(&self) -> usize {
        *self.libraries_calls.read().await
    }

    /// Credential sent with the most recent libraries request.
    pub async fn last_credential(&self) -> Option<String> {
        self.last_credential.read().await.clone()
    }
}

#[async_trait]
impl MetadataService for MockMetadataService {
    async fn health(&self) -> Result<HealthStatus, CatalogError> {
        *self.health_calls.write().await += 1;

        if *self.unreachable.read().await {
            return Err(CatalogError::NetworkUnreachable(
                "connection refused".to_string(),
            ));
        }

        Ok(HealthStatus {
            status: "ok".to_string(),
            plex: Some(UpstreamHealth {
                status: "connected".to_string(),
            }),
        })
    }

    async fn libraries(&self, credential: Option<&str>) -> Result<Catalog, CatalogError> {
        *self.libraries_calls.write().await += 1;
        *self.last_credential.write().await = credential.map(str::to_string);

        let response = if *self.unreachable.read().await {
            Err(CatalogError::NetworkUnreachable(
                "connection refused".to_string(),
            ))
        } else if let Some(status) = *self.libraries_status.read().await {
            Err(CatalogError::UpstreamStatus { status })
        } else if *self.libraries_malformed.read().await {
            Err(CatalogError::Parse("expected a list of libraries".to_string()))
        } else {
            Ok(self.catalog.read().await.clone())
        };

        let delay = *self.libraries_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
