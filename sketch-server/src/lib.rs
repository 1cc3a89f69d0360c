//! # Sketch Studio Server Library
//!
//! Shared types and functionality for the sketch-studio server.
//! This library is used by both the binary and integration tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sketch_pipeline::{
    Capabilities, CapabilityError, FileDocumentStore, HttpAiClient, HttpAssetProbe,
    LocalObjectStorage, Orchestrator, ProgressObserver, StorageError, StoreError, Uploader,
};
use thiserror::Error;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod health;
pub mod metrics;
pub mod routes;

pub use config::{ServerArgs, ServerConfig};

/// Largest accepted request body; drawings arrive as base64 data URIs.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Timeout for asset reachability probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors while wiring the server from configuration.
#[derive(Debug, Error)]
pub enum StartupError {
    /// A data directory could not be created.
    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
    /// An HTTP adapter could not be built.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    /// Object storage rejected its configuration.
    #[error("invalid storage configuration: {0}")]
    Storage(#[from] StorageError),
    /// Document store could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Transformation orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Directory served under `/assets`.
    pub assets_dir: PathBuf,
    /// Directory holding creation documents.
    pub documents_dir: PathBuf,
}

impl AppState {
    /// Wire the production capabilities described by `config`.
    ///
    /// Creates the data directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if a directory or adapter cannot be set up.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let assets_dir = config.assets_dir();
        let documents_dir = config.documents_dir();
        std::fs::create_dir_all(&assets_dir)?;

        let storage = Arc::new(LocalObjectStorage::new(
            &assets_dir,
            config.public_url.as_str(),
        )?);
        let uploader =
            Uploader::new(storage.clone(), config.upload).with_observer(upload_progress_logger());

        let ai = Arc::new(HttpAiClient::new(
            config.ai_url.as_str(),
            config.ai_token.clone(),
            config.ai_timeout,
        )?);
        let capabilities = Capabilities {
            transformer: ai.clone(),
            titles: ai.clone(),
            moderator: ai.clone(),
            upscaler: ai,
            storage,
            documents: Arc::new(FileDocumentStore::new(&documents_dir)?),
            probe: Arc::new(HttpAssetProbe::new(PROBE_TIMEOUT)?),
        };

        Ok(Self {
            orchestrator: Arc::new(Orchestrator::with_uploader(capabilities, uploader)),
            assets_dir,
            documents_dir,
        })
    }
}

/// Trace upload progress, one event per reported fraction.
fn upload_progress_logger() -> ProgressObserver {
    Arc::new(|path: &str, fraction: f64| {
        tracing::trace!(path, progress = fraction, "Upload progress");
    })
}

/// Build the application router: API, health probes and asset serving.
///
/// CORS and the metrics endpoint are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.assets_dir);

    Router::new()
        // Health check endpoints (Kubernetes probes)
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/drawings/transform", post(routes::transform_handler))
        .route("/api/creations/{id}", get(routes::get_creation_handler))
        .route("/api/creations/{id}/upscale", post(routes::upscale_handler))
        .route(
            "/api/creations/{id}/visibility",
            post(routes::visibility_handler),
        )
        // Stored images, addressed by LocalObjectStorage URLs
        .nest_service(config::ASSETS_ROUTE, assets)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        // Request ID for distributed tracing correlation
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // Structured request tracing with timing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
