//! HTTP client for the library metadata service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{CatalogError, HealthStatus, MetadataService};
use crate::config::{ConnectionSettings, Endpoint};
use crate::library::Catalog;

/// Build the shared HTTP client used by every service client.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Metadata service client over HTTP.
pub struct HttpMetadataClient {
    client: Client,
    settings: Arc<ConnectionSettings>,
}

impl HttpMetadataClient {
    pub fn new(client: Client, settings: Arc<ConnectionSettings>) -> Self {
        Self { client, settings }
    }
}

fn unreachable(e: reqwest::Error) -> CatalogError {
    CatalogError::NetworkUnreachable(e.to_string())
}

#[async_trait]
impl MetadataService for HttpMetadataClient {
    async fn health(&self) -> Result<HealthStatus, CatalogError> {
        let url = self.settings.endpoint_url(Endpoint::Health);
        debug!("Health check: {}", url);

        let response = self.client.get(&url).send().await.map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::NetworkUnreachable(format!(
                "health check returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(unreachable)?;
        match serde_json::from_str(&body) {
            Ok(health) => Ok(health),
            Err(e) => {
                warn!("Unrecognized health response, assuming healthy: {}", e);
                Ok(HealthStatus::default())
            }
        }
    }

    async fn libraries(&self, credential: Option<&str>) -> Result<Catalog, CatalogError> {
        let url = self.settings.endpoint_url(Endpoint::Libraries);
        debug!(
            "Fetching libraries: {} (credential: {})",
            url,
            credential.is_some()
        );

        let response = self
            .client
            .get(&url)
            .headers(ConnectionSettings::credential_headers(credential))
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(format!("Failed to parse libraries response: {}", e)))
    }
}
