//! Mock poster service for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::poster::{PosterError, PosterService};

/// Mock implementation of the PosterService trait.
///
/// Unknown title/year pairs answer [`PosterError::NotFound`], like an
/// upstream body without `posterUrl`.
#[derive(Debug, Clone, Default)]
pub struct MockPosterService {
    posters: Arc<RwLock<HashMap<(String, Option<i32>), String>>>,
    status: Arc<RwLock<Option<u16>>>,
    lookups: Arc<RwLock<Vec<(String, Option<i32>)>>>,
}

impl MockPosterService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_poster(&self, title: &str, year: Option<i32>, url: &str) {
        self.posters
            .write()
            .await
            .insert((title.to_string(), year), url.to_string());
    }

    /// Answer every lookup with this non-success status.
    pub async fn set_status(&self, status: Option<u16>) {
        *self.status.write().await = status;
    }

    /// Every lookup made, in order.
    pub async fn lookups(&self) -> Vec<(String, Option<i32>)> {
        self.lookups.read().await.clone()
    }

    pub async fn lookup_count(&self) -> usize {
        self.lookups.read().await.len()
    }
}

#[async_trait]
impl PosterService for MockPosterService {
    async fn lookup(&self, title: &str, year: Option<i32>) -> Result<String, PosterError> {
        self.lookups.write().await.push((title.to_string(), year));

        if let Some(status) = *self.status.read().await {
            return Err(PosterError::Status(status));
        }

        self.posters
            .read()
            .await
            .get(&(title.to_string(), year))
            .cloned()
            .ok_or(PosterError::NotFound)
    }
}
