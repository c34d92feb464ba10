//! Poster resolution with a per title/year cache.
//!
//! Cache keys are the literal `poster_{title}_{year}` string. Titles are not
//! normalized, so "Amélie" and "Amelie" are distinct entries.

mod client;

pub use client::HttpPosterClient;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ErrorKind;
use crate::library::{Item, ItemId};
use crate::metrics;
use crate::store::{StorageBudget, POSTER_KEY_PREFIX};

/// Errors from a poster lookup. Never surfaced; the resolver maps them to
/// the placeholder.
#[derive(Debug, Error)]
pub enum PosterError {
    /// The service answered without a poster URL.
    #[error("No poster found")]
    NotFound,

    #[error("Poster service returned HTTP {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PosterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PosterError::NotFound | PosterError::Status(_) => ErrorKind::PosterNotFound,
            PosterError::Http(_) => ErrorKind::NetworkUnreachable,
        }
    }
}

/// Trait for the poster lookup service.
#[async_trait]
pub trait PosterService: Send + Sync {
    /// Look up the poster URL for a title and optional year.
    async fn lookup(&self, title: &str, year: Option<i32>) -> Result<String, PosterError>;
}

/// Store key for a title/year pair. A missing year leaves the suffix empty.
pub fn cache_key(title: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{}{}_{}", POSTER_KEY_PREFIX, title, year),
        None => format!("{}{}_", POSTER_KEY_PREFIX, title),
    }
}

/// Cache-first poster lookup falling back to a fixed placeholder.
pub struct PosterResolver {
    service: Arc<dyn PosterService>,
    budget: Arc<StorageBudget>,
    placeholder: String,
}

impl PosterResolver {
    pub fn new(
        service: Arc<dyn PosterService>,
        budget: Arc<StorageBudget>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            service,
            budget,
            placeholder: placeholder.into(),
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Resolve a poster URL. Always returns a URL, the placeholder on any failure.
    ///
    /// Failures are not cached; the next call for the same key asks the
    /// service again.
    pub async fn resolve(&self, title: &str, year: Option<i32>) -> String {
        let key = cache_key(title, year);

        if let Some(url) = self.budget.read(&key) {
            debug!("Poster cache hit: {}", key);
            metrics::POSTER_LOOKUPS
                .with_label_values(&["cache_hit"])
                .inc();
            return url;
        }

        match self.service.lookup(title, year).await {
            Ok(url) => {
                self.budget.write(&key, &url);
                metrics::POSTER_LOOKUPS.with_label_values(&["fetched"]).inc();
                url
            }
            Err(e) => {
                if let PosterError::NotFound = e {
                    debug!("No poster for '{}' ({:?})", title, year);
                } else {
                    warn!(kind = %e.kind(), "Poster lookup failed for '{}': {}", title, e);
                }
                metrics::POSTER_LOOKUPS
                    .with_label_values(&["placeholder"])
                    .inc();
                self.placeholder.clone()
            }
        }
    }

    /// Resolve the poster for an item, keyed by its original title when present.
    pub async fn resolve_item(&self, item: &Item) -> String {
        self.resolve(item.metadata.poster_title(), item.metadata.year)
            .await
    }

    /// Resolve posters one at a time, in list order.
    pub async fn resolve_all(&self, items: &[Item]) -> Vec<(ItemId, String)> {
        let mut posters = Vec::with_capacity(items.len());
        for item in items {
            posters.push((item.id, self.resolve_item(item).await));
        }
        posters
    }
}
