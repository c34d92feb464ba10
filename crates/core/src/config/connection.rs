//! Backend location and credential.

use std::sync::{Arc, RwLock};

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use super::{ConfigError, Config, EndpointConfig};
use crate::store::{StorageBudget, CREDENTIAL_KEY};

/// Header carrying the shared-secret credential.
pub const CREDENTIAL_HEADER: &str = "x-password";

/// Named endpoints of the metadata and poster services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Libraries,
    Poster,
}

/// Resolves service URLs and holds the optional credential.
///
/// The credential is process-wide and persisted; an empty string means unset.
pub struct ConnectionSettings {
    base_url: String,
    endpoints: EndpointConfig,
    credential: RwLock<Option<String>>,
    budget: Arc<StorageBudget>,
}

impl ConnectionSettings {
    /// Build settings for the configured environment.
    pub fn new(config: &Config, budget: Arc<StorageBudget>) -> Result<Self, ConfigError> {
        let backend = &config.backend;
        let base_url = backend
            .servers
            .get(&backend.environment)
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "no server configured for environment '{}'",
                    backend.environment
                ))
            })?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            base_url,
            endpoints: config.endpoints.clone(),
            credential: RwLock::new(None),
            budget,
        })
    }

    /// Base URL of the active environment.
    pub fn resolve_base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL joined with the endpoint's path.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        let path = match endpoint {
            Endpoint::Health => &self.endpoints.health,
            Endpoint::Libraries => &self.endpoints.libraries,
            Endpoint::Poster => &self.endpoints.poster,
        };
        format!("{}{}", self.base_url, path)
    }

    /// Poster lookup URL for a title and year.
    ///
    /// A missing year is sent as an empty value. The credential, when set,
    /// travels as the `password` query parameter.
    pub fn poster_url(&self, title: &str, year: Option<i32>) -> String {
        let year = year.map(|y| y.to_string()).unwrap_or_default();
        let url = format!(
            "{}?title={}&year={}",
            self.endpoint_url(Endpoint::Poster),
            urlencoding::encode(title),
            year
        );

        match self.credential() {
            Some(credential) => format!("{}&password={}", url, urlencoding::encode(&credential)),
            None => url,
        }
    }

    /// Headers for authenticated requests: the credential if set, else none.
    pub fn request_headers(&self) -> HeaderMap {
        Self::credential_headers(self.credential().as_deref())
    }

    /// Headers carrying an arbitrary credential, e.g. one being validated.
    pub fn credential_headers(credential: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(credential) = credential.filter(|c| !c.is_empty()) {
            match HeaderValue::from_str(credential) {
                Ok(value) => {
                    headers.insert(CREDENTIAL_HEADER, value);
                }
                Err(_) => warn!("Credential contains characters not allowed in a header"),
            }
        }
        headers
    }

    /// Current credential, if set.
    pub fn credential(&self) -> Option<String> {
        self.credential.read().unwrap().clone()
    }

    /// Set and persist the credential. An empty value clears it entirely.
    pub fn set_credential(&self, value: &str) {
        if value.is_empty() {
            *self.credential.write().unwrap() = None;
            self.budget.remove(CREDENTIAL_KEY);
            info!("Credential cleared");
        } else {
            *self.credential.write().unwrap() = Some(value.to_string());
            self.budget.write(CREDENTIAL_KEY, value);
            info!("Credential updated");
        }
    }

    /// Restore the persisted credential, returning it.
    pub fn load_credential(&self) -> Option<String> {
        if let Some(saved) = self.budget.read(CREDENTIAL_KEY).filter(|s| !s.is_empty()) {
            *self.credential.write().unwrap() = Some(saved);
        }
        self.credential()
    }
}
