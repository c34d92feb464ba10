//! Text rendering of items and reports.

use std::fmt::Write;

use marquee_core::catalog::CatalogSource;
use marquee_core::{CatalogCache, Item, UsageReport};

/// One-item summary card.
pub fn card(item: &Item, favorite: bool, watch_later: bool, poster: Option<&str>) -> String {
    let meta = &item.metadata;
    let mut out = format!("[{}] {}", item.id, meta.display_title());
    if let Some(year) = meta.year {
        let _ = write!(out, " ({})", year);
    }
    if let Some(rating) = meta.rating {
        let _ = write!(out, "  {:.1}/10", rating);
    }
    if let Some(content_rating) = &meta.content_rating {
        let _ = write!(out, "  {}", content_rating);
    }

    let genres = meta.genre_names();
    if !genres.is_empty() {
        let _ = write!(out, "\n    {}", genres.join(", "));
    }

    let mut marks = Vec::new();
    if favorite {
        marks.push("favorite");
    }
    if watch_later {
        marks.push("watch later");
    }
    if !marks.is_empty() {
        let _ = write!(out, "\n    [{}]", marks.join("] ["));
    }

    if let Some(poster) = poster {
        let _ = write!(out, "\n    poster: {}", poster);
    }
    out
}

/// Every field of an item, one per line.
pub fn detail(item: &Item) -> String {
    let meta = &item.metadata;
    let mut out = String::new();

    let _ = writeln!(out, "{}", meta.display_title());
    if let Some(original) = meta.original_title.as_deref().filter(|o| *o != meta.title) {
        let _ = writeln!(out, "  original title: {}", original);
    }
    field(&mut out, "id", Some(item.id.to_string()));
    field(&mut out, "year", meta.year.map(|y| y.to_string()));
    field(&mut out, "rating", meta.rating.map(|r| format!("{:.1}", r)));
    field(
        &mut out,
        "audience rating",
        meta.audience_rating.map(|r| format!("{:.1}", r)),
    );
    field(&mut out, "content rating", meta.content_rating.clone());
    field(&mut out, "studio", meta.studio.clone());
    list(&mut out, "genres", &meta.genre_names());
    list(&mut out, "directors", &meta.director_names());
    list(&mut out, "writers", &meta.writer_names());
    list(&mut out, "cast", &meta.role_names());
    field(&mut out, "video codec", meta.video_codec().map(str::to_string));
    field(
        &mut out,
        "audio channels",
        meta.audio_channels().map(|c| c.to_string()),
    );
    field(&mut out, "resolution", meta.resolution());
    if let Some(summary) = &meta.summary {
        let _ = writeln!(out, "\n{}", summary);
    }
    out
}

fn field(out: &mut String, label: &str, value: Option<String>) {
    if let Some(value) = value {
        let _ = writeln!(out, "  {}: {}", label, value);
    }
}

fn list(out: &mut String, label: &str, values: &[&str]) {
    if !values.is_empty() {
        let _ = writeln!(out, "  {}: {}", label, values.join(", "));
    }
}

/// Where the catalog came from and how it is cached.
pub fn catalog_source(catalog: &CatalogCache) -> String {
    let saved = catalog
        .saved_at()
        .map(|at| format!(", saved {}", at.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();

    match catalog.source() {
        Some(CatalogSource::Cache(fidelity)) => {
            format!("source: cache ({} fidelity{})", fidelity, saved)
        }
        Some(CatalogSource::Network) => match catalog.persisted_fidelity() {
            Some(fidelity) => format!("source: network (cached at {} fidelity{})", fidelity, saved),
            None => "source: network (not cached, memory only)".to_string(),
        },
        None => "source: none".to_string(),
    }
}

pub fn usage(report: &UsageReport, quota_bytes: u64) -> String {
    format!(
        "posters  {:>10} bytes\ncatalog  {:>10} bytes\nother    {:>10} bytes\ntotal    {:>10} bytes of {}",
        report.poster_cache,
        report.catalog_cache,
        report.other,
        report.total(),
        quota_bytes
    )
}
