// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the project feed service.
//!
//! - `POST /webhook`: ingest a webhook delivery
//! - `GET /projects.geojson`: serve the cached feed, never recomputed here
//! - `GET /health`, `GET /healthz`: liveness plus last regeneration summary
//! - `GET /metrics`: Prometheus exposition (when enabled)

use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::feed::{load_published, FeedRegenerator};
use crate::ingest::{IngestOutcome, Ingestor};
use crate::metrics::Metrics;
use crate::store::RecordStore;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Media type of the published feed.
pub const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Failures while wiring the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Parsed once from `config.signature.header`
    pub signature_header: HeaderName,
    pub store: Arc<dyn RecordStore>,
    pub regenerator: Arc<FeedRegenerator>,
    pub ingestor: Ingestor,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wire the pipeline components around a store.
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Result<Arc<Self>, StateError> {
        let signature_header = config.signature.header_name()?;
        let metrics = Arc::new(Metrics::new()?);
        let regenerator = Arc::new(FeedRegenerator::new(store.clone(), metrics.clone()));
        let ingestor = Ingestor::new(&config, store.clone(), regenerator.clone(), metrics.clone());

        Ok(Arc::new(Self {
            config,
            signature_header,
            store,
            regenerator,
            ingestor,
            metrics,
        }))
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let feed_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS]);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/projects.geojson", get(serve_feed).layer(feed_cors))
        .route(
            "/webhook",
            post(ingest_webhook).layer(DefaultBodyLimit::max(state.config.max_body_bytes)),
        );

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_regenerated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_features: Option<usize>,
}

/// Webhook acknowledgment body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl From<IngestOutcome> for WebhookAck {
    fn from(outcome: IngestOutcome) -> Self {
        let status = outcome.label();
        let (id, published) = match outcome {
            IngestOutcome::Stored { id, published } | IngestOutcome::MissingCoords { id, published } => {
                (Some(id), Some(published))
            }
            IngestOutcome::Ignored => (None, None),
        };
        Self {
            ok: true,
            status,
            id,
            published,
        }
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let last = state.regenerator.last_status();
    Json(HealthResponse {
        status: "healthy",
        service: "project-feed",
        version: env!("CARGO_PKG_VERSION"),
        last_regenerated_at: last.map(|s| s.completed_at),
        published_features: last.map(|s| s.features),
    })
}

/// Serve the cached feature collection.
pub async fn serve_feed(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let body = load_published(state.store.as_ref()).await.map_err(|err| {
        error!(error = %err, "Failed to read published feed");
        AppError::from(err)
    })?;

    let cache_control = format!("public, max-age={}", state.config.feed.max_age_secs);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, cache_control),
        ],
        body,
    )
        .into_response())
}

/// Receive a webhook delivery.
pub async fn ingest_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    // A header that is not visible ASCII can never match an encoded digest
    let signature = headers
        .get(&state.signature_header)
        .map(|value| value.to_str().unwrap_or_default());

    let outcome = state.ingestor.ingest(signature, &body).await?;
    Ok(Json(outcome.into()))
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
