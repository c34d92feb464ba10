//! Filtering, sorting and search over a library's items.
//!
//! Everything here is pure: the same items and query always produce the
//! same output in the same order.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use icu_collator::{Collator, CollatorOptions, Strength};
use serde::{Deserialize, Serialize};

use crate::library::{Item, Library, Metadata};

/// Name of the library selected by default when present.
pub const DEFAULT_LIBRARY_NAME: &str = "Movies";

/// Sort order for the visible items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Ascending by title, case-insensitive.
    Title,
    /// Descending by year, missing years last (as 0).
    Year,
    /// Descending by rating, missing ratings last (as 0).
    Rating,
    /// Keep the filtered order.
    #[default]
    Unsorted,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Year => "year",
            SortKey::Rating => "rating",
            SortKey::Unsorted => "unsorted",
        }
    }
}

/// Unrecognized names map to [`SortKey::Unsorted`].
impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => SortKey::Title,
            "year" => SortKey::Year,
            "rating" => SortKey::Rating,
            _ => SortKey::Unsorted,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text query, filters and sort key for one view of a library.
///
/// Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub content_rating: String,
    #[serde(default)]
    pub sort: SortKey,
}

impl BrowseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    pub fn with_content_rating(mut self, content_rating: impl Into<String>) -> Self {
        self.content_rating = content_rating.into();
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Whether an item passes the query and both filters.
    pub fn matches(&self, item: &Item) -> bool {
        let meta = &item.metadata;
        matches_text(meta, &self.query)
            && matches_genre(meta, &self.genre)
            && matches_content_rating(meta, &self.content_rating)
    }
}

fn matches_text(meta: &Metadata, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    meta.title.to_lowercase().contains(&needle)
        || meta
            .genres
            .iter()
            .any(|g| g.tag.to_lowercase().contains(&needle))
        || meta
            .year
            .map(|y| y.to_string().contains(&needle))
            .unwrap_or(false)
}

fn matches_genre(meta: &Metadata, genre: &str) -> bool {
    genre.is_empty()
        || meta
            .genres
            .iter()
            .any(|g| g.tag.to_lowercase() == genre.to_lowercase())
}

// Content ratings match exactly, unlike genres.
fn matches_content_rating(meta: &Metadata, content_rating: &str) -> bool {
    content_rating.is_empty() || meta.content_rating.as_deref() == Some(content_rating)
}

/// Items passing the query and filters, in input order.
pub fn filter_items<'a>(items: &'a [Item], query: &BrowseQuery) -> Vec<&'a Item> {
    items.iter().filter(|item| query.matches(item)).collect()
}

/// Stable in-place sort.
pub fn sort_items(items: &mut [&Item], key: SortKey) {
    match key {
        SortKey::Title => items.sort_by(|a, b| compare_titles(&a.metadata, &b.metadata)),
        SortKey::Year => items.sort_by(|a, b| {
            let a_year = a.metadata.year.unwrap_or(0);
            let b_year = b.metadata.year.unwrap_or(0);
            b_year.cmp(&a_year)
        }),
        SortKey::Rating => items.sort_by(|a, b| {
            let a_rating = a.metadata.rating.unwrap_or(0.0);
            let b_rating = b.metadata.rating.unwrap_or(0.0);
            b_rating.total_cmp(&a_rating)
        }),
        SortKey::Unsorted => {}
    }
}

thread_local! {
    // Root locale at primary strength: case and accents are ignored.
    static TITLE_COLLATOR: Option<Collator> = {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Primary);
        Collator::try_new(&Default::default(), options).ok()
    };
}

fn compare_titles(a: &Metadata, b: &Metadata) -> Ordering {
    let a_title = a.title.as_str();
    let b_title = b.title.as_str();
    let collated = TITLE_COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a_title, b_title),
        None => Ordering::Equal,
    });
    collated
        .then_with(|| a_title.to_lowercase().cmp(&b_title.to_lowercase()))
        .then_with(|| a_title.cmp(b_title))
}

/// Filter then sort.
pub fn browse<'a>(items: &'a [Item], query: &BrowseQuery) -> Vec<&'a Item> {
    let mut visible = filter_items(items, query);
    sort_items(&mut visible, query.sort);
    visible
}

/// Library shown first: the one named "Movies", else the first, else none.
pub fn default_library(catalog: &[Library]) -> Option<&Library> {
    catalog
        .iter()
        .find(|library| library.name == DEFAULT_LIBRARY_NAME)
        .or_else(|| catalog.first())
}

/// Distinct filter values present in a library, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub genres: Vec<String>,
    pub content_ratings: Vec<String>,
}

pub fn facets(items: &[Item]) -> Facets {
    let mut seen_genres = HashSet::new();
    let mut seen_ratings = HashSet::new();
    let mut facets = Facets::default();

    for item in items {
        for genre in &item.metadata.genres {
            if seen_genres.insert(genre.tag.as_str()) {
                facets.genres.push(genre.tag.clone());
            }
        }
        if let Some(rating) = item.metadata.content_rating.as_deref() {
            if seen_ratings.insert(rating) {
                facets.content_ratings.push(rating.to_string());
            }
        }
    }
    facets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn ids(items: &[&Item]) -> Vec<u64> {
        items.iter().map(|i| i.id).collect()
    }

    fn rated(id: u64, title: &str, year: Option<i32>, rating: Option<f64>) -> Item {
        let mut item = fixtures::item(id, title, 0, &[]);
        item.metadata.year = year;
        item.metadata.rating = rating;
        item
    }

    #[test]
    fn test_scenario_query_and_year_sort() {
        let catalog = fixtures::scenario_catalog();
        let items = &default_library(&catalog).unwrap().items;

        let filtered = browse(items, &BrowseQuery::new().with_query("a"));
        assert_eq!(ids(&filtered), vec![1]);

        let by_year = browse(items, &BrowseQuery::new().with_sort(SortKey::Year));
        assert_eq!(ids(&by_year), vec![2, 1]);
    }

    #[test]
    fn test_query_matches_genre_and_year() {
        let catalog = fixtures::scenario_catalog();
        let items = &catalog[0].items;

        assert_eq!(ids(&browse(items, &BrowseQuery::new().with_query("COMED"))), vec![2]);
        assert_eq!(ids(&browse(items, &BrowseQuery::new().with_query("201"))), vec![2]);
        assert_eq!(ids(&browse(items, &BrowseQuery::new())), vec![1, 2]);
    }

    #[test]
    fn test_genre_is_case_insensitive_content_rating_is_not() {
        let mut items = fixtures::scenario_catalog().remove(0).items;
        items[0].metadata.content_rating = Some("PG-13".to_string());

        let genre = BrowseQuery::new().with_genre("drama");
        assert_eq!(ids(&filter_items(&items, &genre)), vec![1]);

        let exact = BrowseQuery::new().with_content_rating("PG-13");
        assert_eq!(ids(&filter_items(&items, &exact)), vec![1]);
        let lower = BrowseQuery::new().with_content_rating("pg-13");
        assert!(filter_items(&items, &lower).is_empty());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let items = fixtures::scenario_catalog().remove(0).items;
        let query = BrowseQuery::new().with_query("b").with_genre("comedy");

        let once: Vec<Item> = filter_items(&items, &query).into_iter().cloned().collect();
        let twice = filter_items(&once, &query);

        assert_eq!(ids(&twice), ids(&filter_items(&items, &query)));
    }

    #[test]
    fn test_unsorted_preserves_order() {
        let items = vec![
            rated(3, "C", Some(1990), None),
            rated(1, "A", None, Some(9.0)),
            rated(2, "B", Some(2020), Some(1.0)),
        ];
        let mut refs: Vec<&Item> = items.iter().collect();
        sort_items(&mut refs, SortKey::from("popularity"));
        assert_eq!(ids(&refs), vec![3, 1, 2]);

        let mut empty: Vec<&Item> = Vec::new();
        sort_items(&mut empty, SortKey::Unsorted);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_rating_and_year_treat_missing_as_zero() {
        let items = vec![
            rated(1, "A", None, Some(6.5)),
            rated(2, "B", Some(2001), None),
            rated(3, "C", Some(1999), Some(8.1)),
            rated(4, "D", None, None),
        ];

        let mut by_rating: Vec<&Item> = items.iter().collect();
        sort_items(&mut by_rating, SortKey::Rating);
        assert_eq!(ids(&by_rating), vec![3, 1, 2, 4]);

        let mut by_year: Vec<&Item> = items.iter().collect();
        sort_items(&mut by_year, SortKey::Year);
        assert_eq!(ids(&by_year), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_title_sort_ignores_case() {
        let items = vec![
            rated(1, "zulu", None, None),
            rated(2, "Alpha", None, None),
            rated(3, "bravo", None, None),
        ];
        let mut refs: Vec<&Item> = items.iter().collect();
        sort_items(&mut refs, SortKey::Title);
        assert_eq!(ids(&refs), vec![2, 3, 1]);
    }

    #[test]
    fn test_title_sort_collates_accents() {
        let items = vec![
            rated(1, "Zorro", None, None),
            rated(2, "Écoute", None, None),
            rated(3, "eclipse", None, None),
            rated(4, "Ångström", None, None),
        ];
        let mut refs: Vec<&Item> = items.iter().collect();
        sort_items(&mut refs, SortKey::Title);
        assert_eq!(ids(&refs), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_search_and_sort_use_title_only() {
        let mut untitled = rated(1, "", None, None);
        untitled.metadata.original_title = Some("Aardvark".to_string());
        let items = vec![rated(2, "Beta", None, None), untitled];

        let query = BrowseQuery::default().with_query("aardvark");
        assert!(browse(&items, &query).is_empty());

        let sorted = browse(&items, &BrowseQuery::default().with_sort(SortKey::Title));
        assert_eq!(ids(&sorted), vec![1, 2]);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(SortKey::from("Year"), SortKey::Year);
        assert_eq!(SortKey::from("rating"), SortKey::Rating);
        assert_eq!(SortKey::from(""), SortKey::Unsorted);
    }

    #[test]
    fn test_default_library_selection() {
        assert!(default_library(&[]).is_none());

        let shows = Library::new("Shows", "2", Vec::new());
        let movies = Library::new("Movies", "1", Vec::new());
        let both = vec![shows.clone(), movies];
        assert_eq!(default_library(&both).unwrap().key, "1");

        let only_shows = vec![shows];
        assert_eq!(default_library(&only_shows).unwrap().key, "2");
    }

    #[test]
    fn test_facets_first_seen_order() {
        let mut items = vec![
            fixtures::item(1, "A", 2000, &["Drama", "Crime"]),
            fixtures::item(2, "B", 2001, &["Crime", "Comedy"]),
        ];
        items[0].metadata.content_rating = Some("R".to_string());
        items[1].metadata.content_rating = Some("R".to_string());

        let facets = facets(&items);
        assert_eq!(facets.genres, vec!["Drama", "Crime", "Comedy"]);
        assert_eq!(facets.content_ratings, vec!["R"]);
    }
}
