//! Reduced representations of the catalog for persistence.
//!
//! When the full catalog does not fit in the store, progressively smaller
//! projections are tried in [`CASCADE`] order until one persists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Catalog, Item, Library, Metadata};

/// Genres kept per item at minimal fidelity.
pub const MINIMAL_GENRE_COUNT: usize = 3;

/// How much of the catalog a cache envelope retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// The upstream payload unchanged, including fields the browser never reads.
    Full,
    /// Every field the browser reads; media truncated to the first descriptor.
    Lightweight,
    /// Title, original title, year, rating, first genres and content rating.
    Minimal,
}

impl Fidelity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fidelity::Full => "full",
            Fidelity::Lightweight => "lightweight",
            Fidelity::Minimal => "minimal",
        }
    }

    /// Apply this fidelity's projection to every item of the catalog.
    pub fn project(self, catalog: &[Library]) -> Catalog {
        let projection = CASCADE
            .iter()
            .find(|(fidelity, _)| *fidelity == self)
            .map(|(_, projection)| *projection)
            .unwrap_or(full);

        catalog
            .iter()
            .map(|library| Library {
                name: library.name.clone(),
                kind: library.kind.clone(),
                key: library.key.clone(),
                items: library
                    .items
                    .iter()
                    .map(|item| Item {
                        id: item.id,
                        metadata: projection(&item.metadata),
                    })
                    .collect(),
            })
            .collect()
    }
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection from full metadata to the retained subset.
pub type Projection = fn(&Metadata) -> Metadata;

/// Fidelity levels in the order they are attempted.
pub const CASCADE: &[(Fidelity, Projection)] = &[
    (Fidelity::Full, full),
    (Fidelity::Lightweight, lightweight),
    (Fidelity::Minimal, minimal),
];

fn full(meta: &Metadata) -> Metadata {
    meta.clone()
}

fn lightweight(meta: &Metadata) -> Metadata {
    Metadata {
        media: meta.media.iter().take(1).cloned().collect(),
        extra: Default::default(),
        ..meta.clone()
    }
}

fn minimal(meta: &Metadata) -> Metadata {
    Metadata {
        title: meta.title.clone(),
        original_title: meta.original_title.clone(),
        year: meta.year,
        rating: meta.rating,
        genres: meta
            .genres
            .iter()
            .take(MINIMAL_GENRE_COUNT)
            .cloned()
            .collect(),
        content_rating: meta.content_rating.clone(),
        ..Default::default()
    }
}

/// The persisted form of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEnvelope {
    pub fidelity: Fidelity,
    /// When the envelope was written. Absent in bare-array caches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    pub libraries: Catalog,
}

impl CacheEnvelope {
    pub fn new(fidelity: Fidelity, catalog: &[Library]) -> Self {
        Self {
            fidelity,
            saved_at: Some(Utc::now()),
            libraries: fidelity.project(catalog),
        }
    }

    /// Parse a persisted envelope.
    ///
    /// A bare JSON array of libraries is read as a full-fidelity envelope.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Persisted {
            Envelope(CacheEnvelope),
            Bare(Catalog),
        }

        Ok(match serde_json::from_str(raw)? {
            Persisted::Envelope(envelope) => envelope,
            Persisted::Bare(libraries) => Self {
                fidelity: Fidelity::Full,
                saved_at: None,
                libraries,
            },
        })
    }
}
