// HTTP surface: router, shared state, health endpoint

use crate::executor::InferenceExecutor;
use crate::metrics::{MetricsSnapshot, RelayMetrics};
use crate::websocket::detect_handler;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use framewatch_eye::DetectionPipeline;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
    pub executor: Arc<InferenceExecutor>,
    pub metrics: Arc<RelayMetrics>,
    /// Human-readable model origin reported by `/health`
    pub model_source: String,
}

impl AppState {
    pub fn new(
        pipeline: DetectionPipeline,
        executor: InferenceExecutor,
        model_source: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            executor: Arc::new(executor),
            metrics: Arc::new(RelayMetrics::new()),
            model_source: model_source.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub workers: usize,
    pub metrics: MetricsSnapshot,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/detect", get(detect_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.model_source.clone(),
        workers: state.executor.workers(),
        metrics: state.metrics.snapshot(),
    })
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
        info!("Detection endpoint: ws://{}/ws/detect", addr);
    }

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
