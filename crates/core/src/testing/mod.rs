//! Testing utilities and mock implementations of the service traits.
//!
//! The mocks let the catalog cache, poster resolver and session run without
//! a network or a persistent store.
//!
//! # Example
//!
//! ```rust,ignore
//! use marquee_core::testing::{fixtures, MockMetadataService, MockStore};
//!
//! let service = MockMetadataService::new();
//! service.set_catalog(fixtures::scenario_catalog()).await;
//!
//! let store = MockStore::new();
//! store.reject_values_longer_than("librariesData", 1024);
//! ```

mod mock_metadata;
mod mock_poster;
mod mock_store;

pub use mock_metadata::MockMetadataService;
pub use mock_poster::MockPosterService;
pub use mock_store::MockStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::json;

    use crate::library::{Catalog, Item, Library, MediaInfo, Metadata, Tag};

    /// Create an item with a title, year and genres.
    pub fn item(id: u64, title: &str, year: i32, genres: &[&str]) -> Item {
        Item {
            id,
            metadata: Metadata {
                title: title.to_string(),
                year: Some(year),
                genres: genres.iter().map(|g| Tag::from(*g)).collect(),
                ..Default::default()
            },
        }
    }

    /// One "Movies" library with items 1 ("A", 2000, Drama) and 2 ("B", 2010, Comedy).
    pub fn scenario_catalog() -> Catalog {
        vec![Library::new(
            "Movies",
            "1",
            vec![
                item(1, "A", 2000, &["Drama"]),
                item(2, "B", 2010, &["Comedy"]),
            ],
        )]
    }

    /// An item carrying every field a full upstream payload has.
    pub fn detailed_item(id: u64, title: &str, year: i32) -> Item {
        let mut item = item(id, title, year, &["Drama", "Thriller", "Mystery", "Crime"]);
        let meta = &mut item.metadata;
        meta.original_title = Some(format!("{} (Original)", title));
        meta.rating = Some(7.4);
        meta.audience_rating = Some(8.1);
        meta.studio = Some("Studio Ghibli".to_string());
        meta.summary = Some(format!("{} is a film about many things. ", title).repeat(8));
        meta.content_rating = Some("PG-13".to_string());
        meta.directors = vec![Tag::from("Jane Director")];
        meta.writers = vec![Tag::from("Sam Writer"), Tag::from("Alex Writer")];
        meta.roles = (0..6).map(|i| Tag::from(format!("Actor {}", i).as_str())).collect();
        meta.media = vec![
            MediaInfo {
                video_codec: Some("h264".to_string()),
                audio_channels: Some(6),
                width: Some(1920),
                height: Some(1080),
            },
            MediaInfo {
                video_codec: Some("hevc".to_string()),
                audio_channels: Some(2),
                width: Some(3840),
                height: Some(2160),
            },
        ];
        meta.extra.insert("ratingKey".to_string(), json!(id.to_string()));
        meta.extra.insert(
            "thumb".to_string(),
            json!(format!("/library/metadata/{}/thumb/1700000000", id)),
        );
        meta.extra.insert("addedAt".to_string(), json!(1_700_000_000u64 + id));
        item
    }

    /// A "Movies" library of `count` detailed items.
    pub fn heavy_catalog(count: u64) -> Catalog {
        let items = (1..=count)
            .map(|id| detailed_item(id, &format!("Movie {}", id), 1980 + id as i32))
            .collect();
        vec![Library::new("Movies", "1", items)]
    }
}
