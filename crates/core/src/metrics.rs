//! Prometheus metrics for the cache layers.
//!
//! This module provides metrics for:
//! - Catalog loads and the fidelity each catalog was persisted at
//! - Poster lookups and evictions
//! - Store quota failures

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Catalog loads by source.
pub static CATALOG_LOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_catalog_loads_total", "Total catalog loads"),
        &["source"], // "cache", "network", "error"
    )
    .unwrap()
});

/// Catalog persist attempts by the fidelity that ended up stored.
pub static CATALOG_PERSISTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_catalog_persist_total",
            "Catalog persists by resulting fidelity",
        ),
        &["fidelity"], // "full", "lightweight", "minimal", "memory_only"
    )
    .unwrap()
});

/// Poster lookups by result.
pub static POSTER_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_poster_lookups_total", "Total poster lookups"),
        &["result"], // "cache_hit", "fetched", "placeholder"
    )
    .unwrap()
});

/// Writes rejected by the store quota.
pub static STORE_QUOTA_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "marquee_store_quota_failures_total",
        "Writes rejected by the store quota",
    )
    .unwrap()
});

/// Poster entries removed by eviction.
pub static POSTER_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "marquee_poster_evictions_total",
        "Poster cache entries removed by eviction",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // Catalog
    registry
        .register(Box::new(CATALOG_LOADS.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_PERSISTS.clone()))
        .unwrap();

    // Posters and store
    registry
        .register(Box::new(POSTER_LOOKUPS.clone()))
        .unwrap();
    registry
        .register(Box::new(POSTER_EVICTIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(STORE_QUOTA_FAILURES.clone()))
        .unwrap();
}

/// Encode all metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
