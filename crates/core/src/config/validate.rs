use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - The active environment has a server URL
/// - Every server URL is absolute http(s)
/// - Store quota and poster retention are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let backend = &config.backend;
    if !backend.servers.contains_key(&backend.environment) {
        return Err(ConfigError::ValidationError(format!(
            "backend.environment '{}' has no entry in backend.servers",
            backend.environment
        )));
    }

    for (name, url) in &backend.servers {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "backend.servers.{} must be an http(s) URL, got '{}'",
                name, url
            )));
        }
    }

    if config.store.quota_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "store.quota_bytes cannot be 0".to_string(),
        ));
    }

    if config.posters.keep_most_recent == 0 {
        return Err(ConfigError::ValidationError(
            "posters.keep_most_recent cannot be 0".to_string(),
        ));
    }

    Ok(())
}
