//! Service health and credential checks.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CatalogError, MetadataService};
use crate::error::ErrorKind;

/// Interval between background health checks.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Body of the metadata service's health endpoint.
///
/// Any 2xx response counts as reachable; a missing `status` reads as "ok".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    #[serde(default = "default_status")]
    pub status: String,
    /// Status of the media server behind the metadata service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plex: Option<UpstreamHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamHealth {
    pub status: String,
}

fn default_status() -> String {
    "ok".to_string()
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: default_status(),
            plex: None,
        }
    }
}

fn is_good(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "ok" | "healthy" | "online" | "up" | "connected"
    )
}

impl HealthStatus {
    pub fn service_health(&self) -> ServiceHealth {
        if !is_good(&self.status) {
            return ServiceHealth::Degraded;
        }
        match &self.plex {
            Some(plex) if !is_good(&plex.status) => ServiceHealth::Degraded,
            _ => ServiceHealth::Online,
        }
    }
}

/// Indicator state derived from a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceHealth {
    Online,
    /// Reachable, but it or its media server reports a problem.
    Degraded,
    Offline,
}

/// Result of testing a newly entered credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum CredentialStatus {
    Valid,
    Invalid { status: u16 },
    Unreachable { message: String },
}

impl CredentialStatus {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CredentialStatus::Valid => None,
            CredentialStatus::Invalid { .. } => Some(ErrorKind::CredentialInvalid),
            CredentialStatus::Unreachable { .. } => Some(ErrorKind::NetworkUnreachable),
        }
    }
}

/// Check a candidate credential with an authenticated libraries request.
pub async fn validate_credential(service: &dyn MetadataService, candidate: &str) -> CredentialStatus {
    let credential = Some(candidate).filter(|c| !c.is_empty());
    match service.libraries(credential).await {
        Ok(_) => CredentialStatus::Valid,
        Err(CatalogError::UpstreamStatus { status }) => {
            warn!("Credential rejected with HTTP {}", status);
            CredentialStatus::Invalid { status }
        }
        // A 2xx with an unexpected body still means the credential was accepted.
        Err(CatalogError::Parse(_)) => CredentialStatus::Valid,
        Err(e) => CredentialStatus::Unreachable {
            message: e.to_string(),
        },
    }
}

/// Periodic health poller.
pub struct HealthMonitor {
    service: Arc<dyn MetadataService>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(service: Arc<dyn MetadataService>) -> Self {
        Self::with_interval(service, HEALTH_POLL_INTERVAL)
    }

    pub fn with_interval(service: Arc<dyn MetadataService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run a single health check.
    pub async fn check(&self) -> ServiceHealth {
        match self.service.health().await {
            Ok(status) => {
                debug!("Health: {:?}", status);
                status.service_health()
            }
            Err(e) => {
                debug!("Health check failed: {}", e);
                ServiceHealth::Offline
            }
        }
    }

    /// Check immediately, then once per interval, until `on_update` breaks.
    pub async fn run<F>(&self, mut on_update: F)
    where
        F: FnMut(ServiceHealth) -> ControlFlow<()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let health = self.check().await;
            if on_update(health).is_break() {
                break;
            }
        }
    }
}
