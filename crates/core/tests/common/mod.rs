//! In-process fake of the metadata and poster services.
//!
//! Binds an axum router to `127.0.0.1:0` so the real reqwest clients can be
//! exercised end to end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use marquee_core::Config;

/// Controllable state behind the fake routes.
pub struct UpstreamState {
    pub health_status: RwLock<StatusCode>,
    pub health_body: RwLock<Value>,
    pub libraries_body: RwLock<Value>,
    pub libraries_status: RwLock<StatusCode>,
    /// When set, `/libraries` answers 401 unless `x-password` matches.
    pub password: RwLock<Option<String>>,
    /// Poster response bodies keyed by title.
    pub posters: RwLock<HashMap<String, Value>>,
    pub poster_queries: RwLock<Vec<HashMap<String, String>>>,
    pub health_hits: AtomicUsize,
    pub libraries_hits: AtomicUsize,
}

impl UpstreamState {
    pub fn health_hits(&self) -> usize {
        self.health_hits.load(Ordering::SeqCst)
    }

    pub fn libraries_hits(&self) -> usize {
        self.libraries_hits.load(Ordering::SeqCst)
    }
}

pub struct FakeUpstream {
    pub base_url: String,
    pub state: Arc<UpstreamState>,
    _server: tokio::task::JoinHandle<()>,
}

impl FakeUpstream {
    /// Start a healthy upstream serving `libraries` as the catalog body.
    pub async fn start(libraries: Value) -> Self {
        let state = Arc::new(UpstreamState {
            health_status: RwLock::new(StatusCode::OK),
            health_body: RwLock::new(json!({"status": "ok", "plex": {"status": "connected"}})),
            libraries_body: RwLock::new(libraries),
            libraries_status: RwLock::new(StatusCode::OK),
            password: RwLock::new(None),
            posters: RwLock::new(HashMap::new()),
            poster_queries: RwLock::new(Vec::new()),
            health_hits: AtomicUsize::new(0),
            libraries_hits: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/health", get(health))
            .route("/libraries", get(libraries_handler))
            .route("/poster", get(poster))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake upstream");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            _server: server,
        }
    }

    /// A config whose active environment points at this upstream.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config
            .backend
            .servers
            .insert("test".to_string(), self.base_url.clone());
        config.backend.environment = "test".to_string();
        config.backend.timeout_secs = 5;
        config
    }

    pub async fn set_poster(&self, title: &str, body: Value) {
        self.state
            .posters
            .write()
            .await
            .insert(title.to_string(), body);
    }

    pub async fn require_password(&self, password: &str) {
        *self.state.password.write().await = Some(password.to_string());
    }
}

/// The Plex-shaped payload the real metadata service returns.
pub fn plex_libraries() -> Value {
    json!([{
        "library": "Movies",
        "type": "movie",
        "key": 1,
        "items": [
            {
                "full_metadata": {
                    "ratingKey": "1",
                    "title": "A",
                    "year": 2000,
                    "Genre": [{"tag": "Drama"}],
                    "guid": "plex://movie/a"
                }
            },
            {
                "full_metadata": {
                    "ratingKey": "2",
                    "title": "B",
                    "year": 2010,
                    "Genre": [{"tag": "Comedy"}],
                    "Media": [
                        {"videoCodec": "h264", "audioChannels": 6, "width": 1920, "height": 1080},
                        {"videoCodec": "mpeg2", "audioChannels": 2, "width": 720, "height": 480}
                    ]
                }
            }
        ]
    }])
}

async fn health(State(state): State<Arc<UpstreamState>>) -> Response {
    state.health_hits.fetch_add(1, Ordering::SeqCst);
    let status = *state.health_status.read().await;
    let body = state.health_body.read().await.clone();
    (status, Json(body)).into_response()
}

async fn libraries_handler(
    State(state): State<Arc<UpstreamState>>,
    headers: HeaderMap,
) -> Response {
    state.libraries_hits.fetch_add(1, Ordering::SeqCst);

    if let Some(expected) = state.password.read().await.as_deref() {
        let sent = headers.get("x-password").and_then(|v| v.to_str().ok());
        if sent != Some(expected) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})))
                .into_response();
        }
    }

    let status = *state.libraries_status.read().await;
    if !status.is_success() {
        return (status, Json(json!({"error": "upstream failure"}))).into_response();
    }
    Json(state.libraries_body.read().await.clone()).into_response()
}

async fn poster(
    State(state): State<Arc<UpstreamState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.poster_queries.write().await.push(params.clone());

    let title = params.get("title").cloned().unwrap_or_default();
    match state.posters.read().await.get(&title) {
        Some(body) => Json(body.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
    }
}
