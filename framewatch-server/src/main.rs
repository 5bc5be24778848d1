// framewatch-server: real-time object detection relay

use anyhow::Context;
use clap::Parser;
use framewatch_eye::models::ModelManager;
use framewatch_eye::{DetectionPipeline, YoloModel};
use framewatch_server::cli::Cli;
use framewatch_server::executor::InferenceExecutor;
use framewatch_server::{logging, serve, AppState, RelayConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(&cli).context("Failed to load configuration")?;
    logging::init(&config.logging)?;

    info!("Starting framewatch relay v{}", env!("CARGO_PKG_VERSION"));

    let manager = ModelManager::new(Arc::new(config.model.clone()));
    let model_path = manager.resolve().await.context("Model is not available")?;

    let workers = config.inference.workers;
    let model_config = config.model.clone();
    let model = tokio::task::spawn_blocking(move || YoloModel::load(&model_path, &model_config, workers))
        .await
        .context("Model loading task failed")??;

    let model_source = model.source().display().to_string();
    let executor = InferenceExecutor::new(workers)?;
    let pipeline = DetectionPipeline::new(Arc::new(model), config.inference.confidence_threshold);
    info!(
        "Reporting detections with confidence >= {}",
        pipeline.confidence_threshold()
    );

    let state = AppState::new(pipeline, executor, model_source);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;

    serve(listener, state, wait_for_shutdown()).await?;

    info!("framewatch relay stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
