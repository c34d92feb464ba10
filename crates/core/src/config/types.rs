use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub posters: PosterConfig,
}

/// Backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Name of the active entry in `servers`.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Base URL per environment name.
    #[serde(default = "default_servers")]
    pub servers: BTreeMap<String, String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            servers: default_servers(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_servers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("local".to_string(), "http://localhost:3000".to_string()),
        (
            "production".to_string(),
            "https://mymovies-latest.onrender.com".to_string(),
        ),
    ])
}

fn default_timeout() -> u32 {
    30
}

/// Endpoint path table, appended to the active base URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EndpointConfig {
    #[serde(default = "default_health_path")]
    pub health: String,
    #[serde(default = "default_libraries_path")]
    pub libraries: String,
    #[serde(default = "default_poster_path")]
    pub poster: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            health: default_health_path(),
            libraries: default_libraries_path(),
            poster: default_poster_path(),
        }
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_libraries_path() -> String {
    "/libraries".to_string()
}

fn default_poster_path() -> String {
    "/poster".to_string()
}

/// Persistent store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Byte budget shared by every persisted entry.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("marquee.db")
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

/// Poster lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PosterConfig {
    /// Image shown when no poster can be resolved.
    #[serde(default = "default_placeholder_url")]
    pub placeholder_url: String,
    /// Poster entries kept when the store runs out of space.
    #[serde(default = "default_keep_most_recent")]
    pub keep_most_recent: usize,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            placeholder_url: default_placeholder_url(),
            keep_most_recent: default_keep_most_recent(),
        }
    }
}

fn default_placeholder_url() -> String {
    "https://i.imgur.com/opmOlZ5.png".to_string()
}

fn default_keep_most_recent() -> usize {
    crate::store::DEFAULT_KEEP_MOST_RECENT
}

/// Config rendered for display (credential reduced to a flag)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub environment: String,
    pub base_url: String,
    pub endpoints: EndpointConfig,
    pub store: StoreConfig,
    pub posters: PosterConfig,
    pub timeout_secs: u32,
    pub credential_configured: bool,
}

impl SanitizedConfig {
    pub fn new(config: &Config, credential_configured: bool) -> Self {
        Self {
            environment: config.backend.environment.clone(),
            base_url: config
                .backend
                .servers
                .get(&config.backend.environment)
                .cloned()
                .unwrap_or_default(),
            endpoints: config.endpoints.clone(),
            store: config.store.clone(),
            posters: config.posters.clone(),
            timeout_secs: config.backend.timeout_secs,
            credential_configured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.backend.environment, "production");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(
            config.backend.servers.get("local").unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(config.endpoints.libraries, "/libraries");
        assert_eq!(config.store.path.to_str().unwrap(), "marquee.db");
        assert_eq!(config.store.quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.posters.keep_most_recent, 50);
    }

    #[test]
    fn test_deserialize_custom_backend() {
        let toml = r#"
[backend]
environment = "staging"
timeout_secs = 5

[backend.servers]
staging = "http://10.0.0.2:3000"

[endpoints]
poster = "/api/poster"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend.environment, "staging");
        assert_eq!(config.backend.servers.len(), 1);
        assert_eq!(config.endpoints.poster, "/api/poster");
        assert_eq!(config.endpoints.health, "/health");
    }

    #[test]
    fn test_sanitized_config() {
        let config = Config::default();
        let sanitized = SanitizedConfig::new(&config, true);
        assert_eq!(sanitized.base_url, "https://mymovies-latest.onrender.com");
        assert!(sanitized.credential_configured);
        assert_eq!(sanitized.posters.placeholder_url, "https://i.imgur.com/opmOlZ5.png");
    }
}
