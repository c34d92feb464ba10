//! The reqwest clients against an in-process fake upstream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tokio_test::assert_ok;

use common::{plex_libraries, FakeUpstream};
use marquee_core::catalog::{build_http_client, validate_credential};
use marquee_core::{
    CatalogCache, ConnectionSettings, CredentialStatus, ErrorKind, HttpMetadataClient, HttpPosterClient,
    MemoryStore, MetadataService, PosterError, PosterService, ServiceHealth, StorageBudget,
};

fn settings(upstream: &FakeUpstream) -> Arc<ConnectionSettings> {
    let budget = Arc::new(StorageBudget::new(Arc::new(MemoryStore::new())));
    Arc::new(ConnectionSettings::new(&upstream.config(), budget).unwrap())
}

fn clients(settings: &Arc<ConnectionSettings>) -> (HttpMetadataClient, HttpPosterClient) {
    let client = build_http_client(Duration::from_secs(5)).unwrap();
    (
        HttpMetadataClient::new(client.clone(), settings.clone()),
        HttpPosterClient::new(client, settings.clone()),
    )
}

#[tokio::test]
async fn test_fetch_plex_shaped_libraries() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    let (metadata, _) = clients(&settings(&upstream));

    let health = assert_ok!(metadata.health().await);
    assert_eq!(health.service_health(), ServiceHealth::Online);

    let catalog = assert_ok!(metadata.libraries(None).await);
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].name, "Movies");
    assert_eq!(catalog[0].key, "1");
    let ids: Vec<u64> = catalog[0].items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(catalog[0].items[1].metadata.resolution().as_deref(), Some("1920x1080"));
    assert!(catalog[0].items[0].metadata.extra.contains_key("guid"));
}

#[tokio::test]
async fn test_non_success_status_carries_code() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    *upstream.state.libraries_status.write().await = StatusCode::BAD_GATEWAY;
    let (metadata, _) = clients(&settings(&upstream));

    let err = metadata.libraries(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamStatusError);
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_unhealthy_service_is_unreachable() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    *upstream.state.health_status.write().await = StatusCode::SERVICE_UNAVAILABLE;
    let (metadata, _) = clients(&settings(&upstream));

    let err = metadata.health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
}

#[tokio::test]
async fn test_credential_header_and_validation() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    upstream.require_password("hunter2").await;
    let settings = settings(&upstream);
    let (metadata, _) = clients(&settings);

    assert_eq!(
        validate_credential(&metadata, "wrong").await,
        CredentialStatus::Invalid { status: 401 }
    );
    assert_eq!(
        validate_credential(&metadata, "hunter2").await,
        CredentialStatus::Valid
    );

    // Settings attach the stored credential as the header.
    settings.set_credential("hunter2");
    let headers = settings.request_headers();
    assert_ok!(metadata.libraries(headers.get("x-password").and_then(|v| v.to_str().ok())).await);
}

#[tokio::test]
async fn test_poster_lookup_query_parameters() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    upstream
        .set_poster("Amélie & Co", json!({"posterUrl": "https://img.test/amelie.jpg"}))
        .await;
    let settings = settings(&upstream);
    settings.set_credential("p@ss word");
    let (_, posters) = clients(&settings);

    let url = posters.lookup("Amélie & Co", Some(2001)).await.unwrap();

    assert_eq!(url, "https://img.test/amelie.jpg");
    let queries = upstream.state.poster_queries.read().await;
    assert_eq!(queries[0].get("title").map(String::as_str), Some("Amélie & Co"));
    assert_eq!(queries[0].get("year").map(String::as_str), Some("2001"));
    assert_eq!(queries[0].get("password").map(String::as_str), Some("p@ss word"));
}

#[tokio::test]
async fn test_poster_missing_url_or_status_is_error() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    upstream.set_poster("Empty", json!({})).await;
    let (_, posters) = clients(&settings(&upstream));

    assert!(matches!(
        posters.lookup("Empty", Some(1999)).await,
        Err(PosterError::NotFound)
    ));
    assert!(matches!(
        posters.lookup("Unknown", None).await,
        Err(PosterError::Status(404))
    ));
}

#[tokio::test]
async fn test_reachable_health_with_unexpected_body_still_loads() {
    let upstream = FakeUpstream::start(plex_libraries()).await;
    *upstream.state.health_body.write().await = json!({"ok": true});
    let budget = Arc::new(StorageBudget::new(Arc::new(MemoryStore::new())));
    let settings = Arc::new(ConnectionSettings::new(&upstream.config(), budget.clone()).unwrap());
    let (metadata, _) = clients(&settings);

    let health = assert_ok!(metadata.health().await);
    assert_eq!(health.service_health(), ServiceHealth::Online);

    let cache = CatalogCache::new(Arc::new(metadata), settings, budget);
    let catalog = assert_ok!(cache.load().await);
    assert_eq!(catalog.len(), 1);
    assert_eq!(upstream.state.libraries_hits(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    // Bind and drop a listener so the port is closed.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let mut config = marquee_core::Config::default();
    config
        .backend
        .servers
        .insert("test".to_string(), format!("http://{}", addr));
    config.backend.environment = "test".to_string();
    let budget = Arc::new(StorageBudget::new(Arc::new(MemoryStore::new())));
    let settings = Arc::new(ConnectionSettings::new(&config, budget).unwrap());
    let (metadata, posters) = clients(&settings);

    let err = metadata.health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
    assert!(matches!(
        posters.lookup("A", Some(2000)).await,
        Err(PosterError::Http(_))
    ));
}
