//! HTTP client for the poster lookup service.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{PosterError, PosterService};
use crate::config::ConnectionSettings;

/// Poster service response body. Every field is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PosterResponse {
    #[serde(default)]
    poster_url: Option<String>,
}

/// Poster service client over HTTP.
pub struct HttpPosterClient {
    client: Client,
    settings: Arc<ConnectionSettings>,
}

impl HttpPosterClient {
    pub fn new(client: Client, settings: Arc<ConnectionSettings>) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl PosterService for HttpPosterClient {
    async fn lookup(&self, title: &str, year: Option<i32>) -> Result<String, PosterError> {
        let url = self.settings.poster_url(title, year);
        debug!("Poster lookup: title='{}', year={:?}", title, year);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PosterError::Status(status.as_u16()));
        }

        // A malformed body counts as no poster.
        let body: PosterResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Unreadable poster response for '{}': {}", title, e);
                return Err(PosterError::NotFound);
            }
        };

        body.poster_url
            .filter(|u| !u.is_empty())
            .ok_or(PosterError::NotFound)
    }
}
